//! The configuration metafield on a discount node.

use serde_json::json;

use skudisc_core::MetafieldStore;

use super::{check_user_errors, AdminClient};
use crate::error::AdminError;
use crate::types::{
    DiscountMetafieldData, MetafieldDefinitionCreateData, MetafieldDefinitionsData,
    MetafieldsSetData, MetafieldsSetInput,
};

const READ_METAFIELD: &str = r"
query DiscountMetafield($id: ID!, $namespace: String!, $key: String!) {
  discountNode(id: $id) {
    metafield(namespace: $namespace, key: $key) { value }
  }
}";

const SET_METAFIELD: &str = r"
mutation SetDiscountMetafield($metafields: [MetafieldsSetInput!]!) {
  metafieldsSet(metafields: $metafields) {
    metafields { id }
    userErrors { field message }
  }
}";

const FIND_DEFINITION: &str = r"
query FindMetafieldDefinition($namespace: String!, $key: String!) {
  metafieldDefinitions(first: 1, ownerType: DISCOUNT, namespace: $namespace, key: $key) {
    nodes { id }
  }
}";

const CREATE_DEFINITION: &str = r"
mutation CreateMetafieldDefinition($definition: MetafieldDefinitionInput!) {
  metafieldDefinitionCreate(definition: $definition) {
    createdDefinition { id }
    userErrors { field message }
  }
}";

impl AdminClient {
    /// Reads the metafield value on `discount_id`. `None` when the discount
    /// has no such metafield yet.
    ///
    /// # Errors
    ///
    /// - [`AdminError::MissingData`] if the discount does not exist.
    /// - Anything from [`AdminClient::execute`].
    pub async fn read_metafield(
        &self,
        discount_id: &str,
        namespace: &str,
        key: &str,
    ) -> Result<Option<String>, AdminError> {
        let data: DiscountMetafieldData = self
            .execute(
                "DiscountMetafield",
                READ_METAFIELD,
                json!({ "id": discount_id, "namespace": namespace, "key": key }),
            )
            .await?;
        let owner = data.discount_node.ok_or_else(|| AdminError::MissingData {
            operation: format!("DiscountMetafield({discount_id})"),
        })?;
        Ok(owner.metafield.map(|m| m.value))
    }

    /// Writes `value` as a `json` metafield on `discount_id`.
    ///
    /// # Errors
    ///
    /// - [`AdminError::UserErrors`] if Shopify rejects the write (for
    ///   example when the namespace is not writable on this discount).
    /// - Anything from [`AdminClient::execute`].
    pub async fn write_metafield(
        &self,
        discount_id: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), AdminError> {
        let input = MetafieldsSetInput {
            owner_id: discount_id,
            namespace,
            key,
            kind: "json",
            value,
        };
        let data: MetafieldsSetData = self
            .execute(
                "SetDiscountMetafield",
                SET_METAFIELD,
                json!({ "metafields": [input] }),
            )
            .await?;
        let payload = data.metafields_set.ok_or_else(|| AdminError::MissingData {
            operation: "SetDiscountMetafield".to_owned(),
        })?;
        check_user_errors("metafieldsSet", &payload.user_errors)?;
        tracing::info!(discount_id, namespace, key, bytes = value.len(), "metafield written");
        Ok(())
    }

    /// Makes sure the discount-owned `json` metafield definition exists,
    /// creating it with merchant read/write access when missing. Returns
    /// `true` if it was created.
    ///
    /// # Errors
    ///
    /// - [`AdminError::UserErrors`] if the definition cannot be created.
    /// - Anything from [`AdminClient::execute`].
    pub async fn ensure_metafield_definition(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<bool, AdminError> {
        let existing: MetafieldDefinitionsData = self
            .execute(
                "FindMetafieldDefinition",
                FIND_DEFINITION,
                json!({ "namespace": namespace, "key": key }),
            )
            .await?;
        if !existing.metafield_definitions.nodes.is_empty() {
            return Ok(false);
        }

        let definition = json!({
            "access": { "admin": "MERCHANT_READ_WRITE" },
            "key": key,
            "name": "SKU Discount Configuration",
            "namespace": namespace,
            "ownerType": "DISCOUNT",
            "type": "json",
        });
        let data: MetafieldDefinitionCreateData = self
            .execute(
                "CreateMetafieldDefinition",
                CREATE_DEFINITION,
                json!({ "definition": definition }),
            )
            .await?;
        let payload = data
            .metafield_definition_create
            .ok_or_else(|| AdminError::MissingData {
                operation: "CreateMetafieldDefinition".to_owned(),
            })?;
        check_user_errors("metafieldDefinitionCreate", &payload.user_errors)?;
        tracing::info!(namespace, key, "created metafield definition");
        Ok(payload.created_definition.is_some())
    }
}

/// The configuration metafield of one discount, as a [`MetafieldStore`].
pub struct DiscountMetafield<'a> {
    client: &'a AdminClient,
    discount_id: String,
    namespace: String,
    key: String,
}

impl<'a> DiscountMetafield<'a> {
    #[must_use]
    pub fn new(
        client: &'a AdminClient,
        discount_id: impl Into<String>,
        namespace: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            discount_id: discount_id.into(),
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    #[must_use]
    pub fn discount_id(&self) -> &str {
        &self.discount_id
    }
}

impl MetafieldStore for DiscountMetafield<'_> {
    type Error = AdminError;

    async fn read(&self) -> Result<Option<String>, AdminError> {
        self.client
            .read_metafield(&self.discount_id, &self.namespace, &self.key)
            .await
    }

    async fn write(&self, json: &str) -> Result<(), AdminError> {
        self.client
            .write_metafield(&self.discount_id, &self.namespace, &self.key, json)
            .await
    }
}
