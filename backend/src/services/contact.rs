//! Customer and supplier directory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use super::item::contains_pattern;
use crate::error::{AppError, AppResult};
use shared::{validate_name, ContactKind, PaginatedResponse, Pagination};

const SELECT_CONTACT: &str = r#"
    SELECT id, name, kind, phone, email, address, tax_id, created_at, updated_at
    FROM contacts
"#;

#[derive(Clone)]
pub struct ContactService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactQuery {
    pub kind: Option<ContactKind>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateContactInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub kind: ContactKind,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 64))]
    pub tax_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateContactInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub kind: Option<ContactKind>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 64))]
    pub tax_id: Option<String>,
}

impl ContactService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, query: &ContactQuery) -> AppResult<PaginatedResponse<Contact>> {
        let page = Pagination::from_query(query.page, query.per_page);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM contacts WHERE TRUE");
        push_contact_conditions(&mut count, query);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.db).await?;

        let mut select = QueryBuilder::<Postgres>::new(SELECT_CONTACT);
        select.push(" WHERE TRUE");
        push_contact_conditions(&mut select, query);
        select
            .push(" ORDER BY name ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let contacts = select.build_query_as::<Contact>().fetch_all(&self.db).await?;

        Ok(PaginatedResponse::new(contacts, &page, total.max(0) as u64))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Contact> {
        sqlx::query_as::<_, Contact>(&format!("{} WHERE id = $1", SELECT_CONTACT))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Contact".to_string()))
    }

    pub async fn create(&self, input: CreateContactInput) -> AppResult<Contact> {
        input
            .validate()
            .map_err(|e| AppError::validation("contact", e.to_string()))?;
        validate_name(&input.name).map_err(|m| AppError::validation("name", m))?;

        let contact = sqlx::query_as::<_, Contact>(
            r#"
            INSERT INTO contacts (name, kind, phone, email, address, tax_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, kind, phone, email, address, tax_id, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(input.kind.as_str())
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(&input.tax_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(contact_id = %contact.id, kind = %contact.kind, "contact created");
        Ok(contact)
    }

    pub async fn update(&self, id: Uuid, input: UpdateContactInput) -> AppResult<Contact> {
        input
            .validate()
            .map_err(|e| AppError::validation("contact", e.to_string()))?;

        sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts SET
                name = COALESCE($2, name),
                kind = COALESCE($3, kind),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email),
                address = COALESCE($6, address),
                tax_id = COALESCE($7, tax_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, kind, phone, email, address, tax_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.kind.map(|k| k.as_str()))
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(&input.tax_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Contact".to_string()))
    }

    /// Documents keep their contact id after the contact is gone
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Contact".to_string()));
        }

        tracing::info!(contact_id = %id, "contact deleted");
        Ok(())
    }
}

fn push_contact_conditions(qb: &mut QueryBuilder<'_, Postgres>, query: &ContactQuery) {
    match query.kind {
        // `both` contacts show up under either side
        Some(ContactKind::Customer) => {
            qb.push(" AND kind IN ('customer', 'both')");
        }
        Some(ContactKind::Supplier) => {
            qb.push(" AND kind IN ('supplier', 'both')");
        }
        Some(ContactKind::Both) => {
            qb.push(" AND kind = 'both'");
        }
        None => {}
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        qb.push(" AND name ILIKE ")
            .push_bind(contains_pattern(search.trim()))
            .push(r" ESCAPE '\'");
    }
}
