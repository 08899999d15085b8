//! Production machines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::sequence::SequenceService;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use shared::DocumentFamily;

const SELECT_MACHINE: &str = r#"
    SELECT id, number, name, location, notes, created_at, updated_at
    FROM machines
"#;

#[derive(Clone)]
pub struct MachineService {
    db: PgPool,
    sequences: SequenceService,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Machine {
    pub id: Uuid,
    pub number: String,
    pub name: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMachineInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateMachineInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl MachineService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            sequences: SequenceService::new(db.clone(), config),
            db,
        }
    }

    pub async fn list(&self) -> AppResult<Vec<Machine>> {
        let machines =
            sqlx::query_as::<_, Machine>(&format!("{} ORDER BY number ASC", SELECT_MACHINE))
                .fetch_all(&self.db)
                .await?;
        Ok(machines)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Machine> {
        sqlx::query_as::<_, Machine>(&format!("{} WHERE id = $1", SELECT_MACHINE))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Machine".to_string()))
    }

    /// Register a machine under the next `MCH-NNNN` number
    pub async fn create(&self, input: CreateMachineInput) -> AppResult<Machine> {
        input
            .validate()
            .map_err(|e| AppError::validation("machine", e.to_string()))?;

        let machine = self
            .sequences
            .create_numbered(DocumentFamily::Machine, |number| {
                let input = &input;
                async move {
                    let machine = sqlx::query_as::<_, Machine>(
                        r#"
                        INSERT INTO machines (number, name, location, notes)
                        VALUES ($1, $2, $3, $4)
                        RETURNING id, number, name, location, notes, created_at, updated_at
                        "#,
                    )
                    .bind(&number)
                    .bind(input.name.trim())
                    .bind(&input.location)
                    .bind(&input.notes)
                    .fetch_one(&self.db)
                    .await?;
                    Ok(machine)
                }
            })
            .await?;

        tracing::info!(machine_id = %machine.id, number = %machine.number, "machine registered");
        Ok(machine)
    }

    pub async fn update(&self, id: Uuid, input: UpdateMachineInput) -> AppResult<Machine> {
        input
            .validate()
            .map_err(|e| AppError::validation("machine", e.to_string()))?;

        sqlx::query_as::<_, Machine>(
            r#"
            UPDATE machines SET
                name = COALESCE($2, name),
                location = COALESCE($3, location),
                notes = COALESCE($4, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, number, name, location, notes, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(&input.location)
        .bind(&input.notes)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Machine".to_string()))
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM machines WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Machine".to_string()));
        }

        tracing::info!(machine_id = %id, "machine deleted");
        Ok(())
    }
}
