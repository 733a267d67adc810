//! PostgreSQL player store

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{debug, error, info, warn};

use super::{AcquisitionChange, EntryWrite, NewMail, PlayerRecord, PlayerStore, STARTING_COINS};
use crate::config::DatabaseConfig;
use crate::error::{PersistenceError, Result};
use crate::game::currency::{Currency, CurrencyAccount};
use crate::game::equipment::{Equipment, EquipmentSlot};
use crate::game::inventory::{Inventories, Inventory, InventoryKind};
use crate::game::{ItemId, MailId, PlayerId};

/// Database row for a penguin
#[derive(Debug, FromRow)]
struct PenguinRow {
    id: i32,
    username: String,
    coins: i32,
    agent_medals: i32,
    color: Option<i32>,
    head: Option<i32>,
    face: Option<i32>,
    neck: Option<i32>,
    body: Option<i32>,
    hand: Option<i32>,
    feet: Option<i32>,
    flag: Option<i32>,
    photo: Option<i32>,
}

impl PenguinRow {
    fn equipment(&self) -> Equipment {
        let columns = [
            self.color, self.head, self.face, self.neck, self.body, self.hand, self.feet,
            self.flag, self.photo,
        ];
        let mut equipment = Equipment::new();
        for (slot, value) in EquipmentSlot::all().iter().zip(columns) {
            equipment.set(*slot, value.map(|id| id as ItemId));
        }
        equipment
    }
}

/// Player store backed by PostgreSQL
pub struct PgPlayerStore {
    pool: PgPool,
}

impl PgPlayerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against the configured database
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect(url)
            .await
            .map_err(PersistenceError::Database)?;

        info!(
            host = %config.host,
            database = %config.database,
            "Connected to PostgreSQL"
        );

        Ok(Self::new(pool))
    }

    async fn find_penguin(&self, username: &str) -> Result<Option<PenguinRow>> {
        let row = sqlx::query_as::<_, PenguinRow>(
            r#"
            SELECT id, username, coins, agent_medals,
                   color, head, face, neck, body, hand, feet, flag, photo
            FROM penguin
            WHERE LOWER(username) = LOWER($1)
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load penguin: {}", e);
            PersistenceError::Database(e)
        })?;

        Ok(row)
    }

    async fn create_penguin(&self, username: &str) -> Result<PenguinRow> {
        let row = sqlx::query_as::<_, PenguinRow>(
            r#"
            INSERT INTO penguin (username, coins, agent_medals)
            VALUES ($1, $2, 0)
            RETURNING id, username, coins, agent_medals,
                      color, head, face, neck, body, hand, feet, flag, photo
            "#,
        )
        .bind(username)
        .bind(STARTING_COINS)
        .fetch_one(&self.pool)
        .await
        .map_err(PersistenceError::Database)?;

        info!(player_id = row.id, username = %username, "Created penguin");

        Ok(row)
    }

    async fn load_inventory(&self, player_id: i32, kind: InventoryKind) -> Result<Inventory> {
        let quantity = if kind.has_quantity() { "quantity" } else { "1" };
        let sql = format!(
            "SELECT {column}, {quantity} FROM {table} WHERE penguin_id = $1",
            column = kind.item_column(),
            quantity = quantity,
            table = kind.table(),
        );

        let rows: Vec<(i32, i32)> = sqlx::query_as(&sql)
            .bind(player_id)
            .fetch_all(&self.pool)
            .await
            .map_err(PersistenceError::Database)?;

        Ok(Inventory::from_entries(
            rows.into_iter()
                .map(|(id, qty)| (id as ItemId, qty.max(0) as u32)),
        ))
    }

    async fn load_permissions(&self, player_id: i32) -> Result<HashSet<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT permission_name FROM penguin_permission WHERE penguin_id = $1",
        )
        .bind(player_id)
        .fetch_all(&self.pool)
        .await
        .map_err(PersistenceError::Database)?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}

#[async_trait]
impl PlayerStore for PgPlayerStore {
    async fn load_or_create(&self, username: &str) -> Result<PlayerRecord> {
        let row = match self.find_penguin(username).await? {
            Some(row) => row,
            None => self.create_penguin(username).await?,
        };

        let mut inventories = Inventories::new();
        for kind in InventoryKind::all() {
            inventories.set(*kind, self.load_inventory(row.id, *kind).await?);
        }
        let permissions = self.load_permissions(row.id).await?;

        debug!(player_id = row.id, username = %row.username, "Loaded penguin");

        Ok(PlayerRecord {
            id: row.id as PlayerId,
            equipment: row.equipment(),
            account: CurrencyAccount::new(row.coins, row.agent_medals),
            username: row.username,
            inventories,
            permissions,
        })
    }

    async fn commit_acquisition(&self, change: &AcquisitionChange) -> Result<()> {
        let kind = change.inventory;
        let mut tx = self.pool.begin().await.map_err(PersistenceError::Database)?;

        let sql = match (change.entry, kind.has_quantity()) {
            (EntryWrite::Insert { .. }, true) => format!(
                "INSERT INTO {} (penguin_id, {}, quantity) VALUES ($1, $2, $3)",
                kind.table(),
                kind.item_column()
            ),
            (EntryWrite::Insert { .. }, false) => format!(
                "INSERT INTO {} (penguin_id, {}) VALUES ($1, $2)",
                kind.table(),
                kind.item_column()
            ),
            (EntryWrite::Update { .. }, _) => format!(
                "UPDATE {} SET quantity = $3 WHERE penguin_id = $1 AND {} = $2",
                kind.table(),
                kind.item_column()
            ),
        };

        let mut query = sqlx::query(&sql)
            .bind(change.player_id as i32)
            .bind(change.item_id as i32);
        if kind.has_quantity() {
            query = query.bind(change.entry.quantity() as i32);
        }
        query
            .execute(&mut *tx)
            .await
            .map_err(PersistenceError::Database)?;

        if let Some(debit) = change.debit {
            let sql = debit_sql(debit.currency);
            let (balance,): (i32,) = sqlx::query_as(&sql)
                .bind(i32::try_from(debit.amount).unwrap_or(i32::MAX))
                .bind(change.player_id as i32)
                .fetch_one(&mut *tx)
                .await
                .map_err(PersistenceError::Database)?;

            if balance != debit.balance {
                warn!(
                    player_id = change.player_id,
                    stored = balance,
                    expected = debit.balance,
                    "Stored balance diverged from the session"
                );
            }
        }

        tx.commit().await.map_err(PersistenceError::Database)?;

        debug!(
            player_id = change.player_id,
            inventory = %kind,
            item_id = change.item_id,
            "Committed acquisition"
        );

        Ok(())
    }

    async fn set_slot(
        &self,
        player_id: PlayerId,
        slot: EquipmentSlot,
        item_id: Option<ItemId>,
    ) -> Result<()> {
        let sql = format!("UPDATE penguin SET {} = $1 WHERE id = $2", slot.name());
        let result = sqlx::query(&sql)
            .bind(item_id.map(|id| id as i32))
            .bind(player_id as i32)
            .execute(&self.pool)
            .await
            .map_err(PersistenceError::Database)?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(format!("penguin {}", player_id)).into());
        }

        Ok(())
    }

    async fn insert_permission(&self, player_id: PlayerId, permission: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO penguin_permission (penguin_id, permission_name)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(player_id as i32)
        .bind(permission)
        .execute(&self.pool)
        .await
        .map_err(PersistenceError::Database)?;

        Ok(())
    }

    async fn insert_mail(&self, mail: &NewMail) -> Result<MailId> {
        let (id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO penguin_postcard (penguin_id, sender_id, postcard_id, send_date, details)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(mail.recipient_id as i32)
        .bind(mail.sender_id.map(|id| id as i32))
        .bind(mail.postcard_id as i32)
        .bind(mail.sent_at)
        .bind(&mail.details)
        .fetch_one(&self.pool)
        .await
        .map_err(PersistenceError::Database)?;

        Ok(id as MailId)
    }
}

impl std::fmt::Debug for PgPlayerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgPlayerStore").finish_non_exhaustive()
    }
}

/// Relative debit, returning the stored balance
fn debit_sql(currency: Currency) -> String {
    format!(
        "UPDATE penguin SET {column} = {column} - $1 WHERE id = $2 RETURNING {column}",
        column = currency.column()
    )
}
