//! Product catalog operations.
//!
//! Simple products have zero or one variant; matrix products are parents with
//! several variants. Both pipelines scope results to the configured
//! subscription lists and hydrate them with catalog and product library
//! details.
//!
//! - [`catalog`] - Lookups shared by both pipelines
//! - [`simple`] - Simple product assembly
//! - [`matrix`] - Matrix product assembly

pub mod catalog;
mod matrix;
mod simple;

use iqmetrix_dropship_core::{DateRange, Envelope, Page, Query, QueryKind, SubscriptionList};
use serde_json::Value;
use tracing::instrument;

use crate::channel::{DropshipChannel, parse_query};
use crate::document::{Document, DocumentExt};
use crate::error::ChannelError;

/// Which product pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductShape {
    Simple,
    Matrix,
}

impl ProductShape {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Matrix => "matrix",
        }
    }
}

impl DropshipChannel {
    /// Get simple products by catalog item id, created or modified date range.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError` if the query is invalid or a vendor call fails.
    pub async fn get_product_simple(&self, query_doc: &Value) -> Result<Envelope<Vec<Value>>, ChannelError> {
        self.get_products(ProductShape::Simple, query_doc).await
    }

    /// Get matrix products by catalog item id, created or modified date range.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError` if the query is invalid or a vendor call fails.
    pub async fn get_product_matrix(&self, query_doc: &Value) -> Result<Envelope<Vec<Value>>, ChannelError> {
        self.get_products(ProductShape::Matrix, query_doc).await
    }

    #[instrument(skip(self, query_doc))]
    async fn get_products(&self, shape: ProductShape, query_doc: &Value) -> Result<Envelope<Vec<Value>>, ChannelError> {
        let query = parse_query(query_doc)?;

        let (products, total) = match &query.kind {
            QueryKind::RemoteIds(_) => {
                let (structures, total) = self.structures_page(&query).await?;
                let products = match shape {
                    ProductShape::Simple => self.simple_from_structures(&structures).await?,
                    ProductShape::Matrix => self.matrix_from_structures(&structures).await?,
                };
                (products, total)
            }
            QueryKind::ModifiedDateRange(range) => {
                tracing::warn!(
                    "Searching by modifiedDateRange is not supported, will search on createdDateRange instead."
                );
                self.search_products(shape, range, query.page).await?
            }
            QueryKind::CreatedDateRange(range) => self.search_products(shape, range, query.page).await?,
        };

        let products: Vec<Value> = products.into_iter().map(Value::Object).collect();
        if products.is_empty() {
            tracing::info!("No products found.");
        } else {
            tracing::info!("Submitting {} {} products...", products.len(), shape.name());
        }
        Ok(Envelope::page(products, query.page.has_more(total)))
    }

    /// Item structures for the requested page of catalog item ids, unique by slug.
    ///
    /// Returns the structures and the total number of unique ids.
    async fn structures_page(&self, query: &Query) -> Result<(Vec<Document>, usize), ChannelError> {
        let ids = query.unique_remote_ids();
        let batch = query.page.slice(&ids);

        let structures = self.fan_out(batch, |id| self.item_structure(id)).await?;

        let mut unique: Vec<Document> = Vec::with_capacity(structures.len());
        for structure in structures.into_iter().flatten() {
            let slug = structure.str_field("Slug");
            if !unique.iter().any(|u| u.str_field("Slug") == slug) {
                unique.push(structure);
            }
        }
        Ok((unique, ids.len()))
    }

    /// Grouped search, per-list filtering and detail hydration.
    async fn search_products(
        &self,
        shape: ProductShape,
        range: &DateRange,
        page: Page,
    ) -> Result<(Vec<Document>, usize), ChannelError> {
        let (items, total) = self.grouped_search(shape, range, page).await?;
        let lists = &self.config().subscription_lists;

        let per_list = self
            .fan_out(lists, |list| {
                let items = items.clone();
                async move {
                    match shape {
                        ProductShape::Simple => self.subscribed_simple_items(items, list).await,
                        ProductShape::Matrix => self.subscribed_matrix_items(items, list).await,
                    }
                }
            })
            .await?;

        let mut products: Vec<Document> = per_list.into_iter().flatten().collect();
        self.hydrate(&mut products).await?;
        Ok((products, total))
    }
}

/// Keep only the variations with a catalog item sourced from the list.
pub(crate) fn retain_list_variations(item: &mut Document, list: &SubscriptionList) {
    if let Some(Value::Array(variations)) = item.get_mut("Variations") {
        variations.retain(|variation| {
            variation
                .get("CatalogItems")
                .and_then(Value::as_array)
                .is_some_and(|items| items.iter().any(|c| list.sources(c.get("SourceIds"))))
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::into_document;
    use serde_json::json;

    #[test]
    fn test_retain_list_variations() {
        let list = SubscriptionList::new("list-a", 7187);
        let mut item = into_document(json!({
            "Slug": "p",
            "Variations": [
                {"Slug": "p-1", "CatalogItems": [{"SourceIds": ["list-a"]}]},
                {"Slug": "p-2", "CatalogItems": [{"SourceIds": ["list-b"]}]},
                {"Slug": "p-3"}
            ]
        }));
        retain_list_variations(&mut item, &list);
        assert_eq!(item["Variations"], json!([{"Slug": "p-1", "CatalogItems": [{"SourceIds": ["list-a"]}]}]));
    }

    #[test]
    fn test_shape_names() {
        assert_eq!(ProductShape::Simple.name(), "simple");
        assert_eq!(ProductShape::Matrix.name(), "matrix");
    }
}
