//! Product repository.

use chrono::Utc;

use boutique_core::{Price, Product, ProductId};

use super::RepositoryError;
use crate::backend::{Document, DocumentStore, IdToken, collections};
use crate::models::NewProduct;

/// Repository for catalog products.
pub struct ProductRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// List every product, sorted by category then name.
    ///
    /// Documents that are not valid products are skipped with a warning so a
    /// single bad entry does not take the catalog down.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the store cannot be read.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let documents = self.store.list_documents(collections::PRODUCTS, None).await?;

        let mut products: Vec<Product> = documents
            .iter()
            .filter_map(|doc| match product_from_document(doc) {
                Ok(product) => Some(product),
                Err(e) => {
                    tracing::warn!(product_id = %doc.id, error = %e, "Skipping invalid product document");
                    None
                }
            })
            .collect();

        products.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        Ok(products)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the store cannot be read.
    /// Returns `RepositoryError::DataCorruption` if the document is not a valid product.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        self.store
            .get_document(collections::PRODUCTS, id.as_str(), None)
            .await?
            .map(|doc| product_from_document(&doc))
            .transpose()
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    pub async fn create(
        &self,
        product: NewProduct,
        token: &IdToken,
    ) -> Result<Product, RepositoryError> {
        let mut doc = Document::default()
            .with("name", product.name.as_str())
            .with("price", product.price.to_f64())
            .with("createdAt", Utc::now());
        for (field, value) in [
            ("category", &product.category),
            ("description", &product.description),
            ("imageUrl", &product.image_url),
        ] {
            if let Some(value) = value {
                doc = doc.with(field, value.as_str());
            }
        }

        let created = self
            .store
            .create_document(collections::PRODUCTS, doc.fields, Some(token))
            .await?;

        Ok(Product {
            id: ProductId::new(created.id),
            name: product.name,
            price: product.price,
            description: product.description,
            category: product.category,
            image_url: product.image_url,
        })
    }

    /// Delete a product. Deleting a missing product succeeds.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the delete fails.
    pub async fn delete(&self, id: &ProductId, token: &IdToken) -> Result<(), RepositoryError> {
        self.store
            .delete_document(collections::PRODUCTS, id.as_str(), Some(token))
            .await?;
        Ok(())
    }
}

/// Validate a `products` document.
pub(crate) fn product_from_document(doc: &Document) -> Result<Product, RepositoryError> {
    let name = doc
        .string("name")
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| RepositoryError::DataCorruption(format!("product {} has no name", doc.id)))?;

    let price = doc
        .number("price")
        .or_else(|| doc.string("price").and_then(|p| p.trim().parse().ok()))
        .and_then(Price::from_f64)
        .ok_or_else(|| {
            RepositoryError::DataCorruption(format!("product {} has no valid price", doc.id))
        })?;

    let optional = |field: &str| {
        doc.string(field)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
    };

    Ok(Product {
        id: ProductId::new(doc.id.as_str()),
        name: name.trim().to_owned(),
        price,
        description: optional("description"),
        category: optional("category"),
        image_url: optional("imageUrl"),
    })
}
