//! Simple product assembly.
//!
//! A catalog item is simple when it has no variants, or exactly one variant
//! on the subscription list. A lone variant is folded onto its parent.

use iqmetrix_dropship_core::SubscriptionList;
use serde_json::Value;

use super::catalog::{annotate, push_unique, vendor_sku_entry, vendor_sku_identifier};
use super::retain_list_variations;
use crate::channel::DropshipChannel;
use crate::document::{Document, DocumentExt, into_document, is_non_empty_array};
use crate::error::ChannelError;

impl DropshipChannel {
    /// Simple products from item structures, for every subscription list.
    pub(super) async fn simple_from_structures(&self, structures: &[Document]) -> Result<Vec<Document>, ChannelError> {
        let per_list = self
            .fan_out(&self.config().subscription_lists, |list| async move {
                let items: Vec<Document> = structures
                    .iter()
                    .cloned()
                    .filter_map(|mut item| {
                        retain_list_variations(&mut item, list);
                        fold_single_variant(item, "Variations")
                    })
                    .collect();

                let mut slugs = Vec::new();
                for item in &items {
                    if let Some(slug) = item.str_field("Slug") {
                        push_unique(&mut slugs, slug);
                    }
                }
                let slug_details = self.slug_details(&slugs).await?;

                Ok(items
                    .into_iter()
                    .map(|mut item| {
                        if let Some(detail) = item.str_field("Slug").and_then(|s| slug_details.object_field(s)) {
                            item.merge(detail);
                        }
                        let vendor_sku = vendor_sku_entry(&item, list);
                        annotate(&mut item, list, vendor_sku);
                        item
                    })
                    .collect::<Vec<_>>())
            })
            .await?;

        Ok(per_list.into_iter().flatten().collect())
    }

    /// Grouped search results reduced to the simple items on one list.
    pub(super) async fn subscribed_simple_items(
        &self,
        items: Vec<Document>,
        list: &SubscriptionList,
    ) -> Result<Vec<Document>, ChannelError> {
        let subscribed = self
            .fan_out(items, |mut item| async move {
                let vendor_sku = vendor_sku_identifier(&item, list);
                annotate(&mut item, list, vendor_sku);
                self.merge_vendor_sku_detail(&mut item, list).await?;

                let products = item.get("Products").and_then(Value::as_array).cloned().unwrap_or_default();
                let variants = self.filter_variants(products, list).await?;
                let keep = !variants.is_empty() || is_non_empty_array(item.get("SourceIds").unwrap_or(&Value::Null));
                item.insert("Products".to_string(), Value::Array(variants));

                Ok(keep.then_some(item))
            })
            .await?;

        Ok(subscribed
            .into_iter()
            .flatten()
            .filter_map(|item| fold_single_variant(item, "Products"))
            .collect())
    }
}

/// Keep items with no variants, fold a single variant onto its parent, and
/// drop items with several variants.
fn fold_single_variant(mut item: Document, key: &str) -> Option<Document> {
    match item.array_field(key) {
        [] => Some(item),
        [variant] => {
            let variant = into_document(variant.clone());
            item.merge(&variant);
            item.insert(key.to_string(), Value::Array(Vec::new()));
            Some(item)
        }
        _ => None,
    }
}
