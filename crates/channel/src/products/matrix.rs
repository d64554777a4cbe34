//! Matrix product assembly.
//!
//! A matrix product is a parent item with more than one variant on the
//! subscription list. Parents and variants are both annotated and hydrated.

use iqmetrix_dropship_core::SubscriptionList;
use serde_json::Value;

use super::catalog::{annotate, push_unique, vendor_sku_entry, vendor_sku_identifier};
use super::retain_list_variations;
use crate::channel::DropshipChannel;
use crate::document::{Document, DocumentExt};
use crate::error::ChannelError;

impl DropshipChannel {
    /// Matrix products from item structures, for every subscription list.
    pub(super) async fn matrix_from_structures(&self, structures: &[Document]) -> Result<Vec<Document>, ChannelError> {
        let per_list = self
            .fan_out(&self.config().subscription_lists, |list| async move {
                let mut items: Vec<Document> = structures
                    .iter()
                    .cloned()
                    .filter_map(|mut item| {
                        retain_list_variations(&mut item, list);
                        (item.array_field("Variations").len() > 1).then_some(item)
                    })
                    .collect();

                let mut slugs = Vec::new();
                for item in &items {
                    if let Some(slug) = item.str_field("Slug") {
                        push_unique(&mut slugs, slug);
                    }
                    for variation in item.array_field("Variations") {
                        if let Some(slug) = variation.get("Slug").and_then(Value::as_str) {
                            push_unique(&mut slugs, slug);
                        }
                    }
                }
                let slug_details = self.slug_details(&slugs).await?;

                for item in &mut items {
                    hydrate_by_slug(item, &slug_details, list);
                    if let Some(Value::Array(variations)) = item.get_mut("Variations") {
                        for variation in variations.iter_mut() {
                            if let Some(variation) = variation.as_object_mut() {
                                hydrate_by_slug(variation, &slug_details, list);
                            }
                        }
                    }
                }
                Ok(items)
            })
            .await?;

        Ok(per_list.into_iter().flatten().collect())
    }

    /// Grouped search results reduced to the matrix items on one list.
    pub(super) async fn subscribed_matrix_items(
        &self,
        items: Vec<Document>,
        list: &SubscriptionList,
    ) -> Result<Vec<Document>, ChannelError> {
        let subscribed = self
            .fan_out(items, |mut item| async move {
                let vendor_sku = vendor_sku_identifier(&item, list);
                annotate(&mut item, list, vendor_sku);

                let products = item.get("Products").and_then(Value::as_array).cloned().unwrap_or_default();
                let variants = self.filter_variants(products, list).await?;
                let is_matrix = variants.len() > 1;
                item.insert("Products".to_string(), Value::Array(variants));

                if !is_matrix {
                    return Ok(None);
                }
                self.merge_vendor_sku_detail(&mut item, list).await?;
                Ok(Some(item))
            })
            .await?;

        Ok(subscribed.into_iter().flatten().collect())
    }
}

/// Merge product library details and annotate, with a `null` vendor SKU when
/// the supplier has none.
fn hydrate_by_slug(doc: &mut Document, slug_details: &Document, list: &SubscriptionList) {
    if let Some(detail) = doc.str_field("Slug").and_then(|slug| slug_details.object_field(slug)) {
        doc.merge(detail);
    }
    let vendor_sku = vendor_sku_entry(doc, list).unwrap_or(Value::Null);
    annotate(doc, list, Some(vendor_sku));
}
