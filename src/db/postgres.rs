use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use crate::error::StoreError;
use crate::model::{EntityKind, Family, Person, Tile, Village};

use super::load::copy_tiles;
use super::{DurableStore, PersistBatch, SequenceCounter};

/// Rows per multi-row INSERT / COPY.
pub const DEFAULT_WRITE_CHUNK: usize = 1000;

/// PostgreSQL durable store. Cloning shares the underlying pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    chunk: usize,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            chunk: DEFAULT_WRITE_CHUNK,
        }
    }

    pub fn with_write_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk.max(1);
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Execute the schema DDL (all CREATE ... IF NOT EXISTS) and seed the
    /// sequence counters.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(include_str!("../../sql/schema.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn int(v: u32) -> i32 {
    v as i32
}

fn id_array<I: IntoIterator<Item = i64>>(ids: I) -> Vec<i64> {
    ids.into_iter().collect()
}

fn to_signed(ids: &[u64]) -> Vec<i64> {
    ids.iter().map(|&id| id as i64).collect()
}

async fn upsert_people(
    conn: &mut sqlx::PgConnection,
    people: &[Person],
    chunk: usize,
) -> Result<(), sqlx::Error> {
    for rows in people.chunks(chunk) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO people (id, tile_id, residency, sex, date_of_birth, family_id, health) ",
        );
        qb.push_values(rows, |mut row, p| {
            row.push_bind(p.id.to_signed())
                .push_bind(int(p.tile_id))
                .push_bind(p.residency.map(int))
                .push_bind(p.sex.as_bool())
                .push_bind(p.date_of_birth.to_string())
                .push_bind(p.family_id.map(|f| f.to_signed()))
                .push_bind(p.health as i16);
        });
        qb.push(
            " ON CONFLICT (id) DO UPDATE SET tile_id = EXCLUDED.tile_id, \
             residency = EXCLUDED.residency, sex = EXCLUDED.sex, \
             date_of_birth = EXCLUDED.date_of_birth, family_id = EXCLUDED.family_id, \
             health = EXCLUDED.health",
        );
        qb.build().execute(&mut *conn).await?;
    }
    Ok(())
}

async fn upsert_families(
    conn: &mut sqlx::PgConnection,
    families: &[Family],
    chunk: usize,
) -> Result<(), sqlx::Error> {
    for rows in families.chunks(chunk) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO families (id, husband_id, wife_id, tile_id, pregnant, delivery_date, children_ids) ",
        );
        qb.push_values(rows, |mut row, f| {
            row.push_bind(f.id.to_signed())
                .push_bind(f.husband_id.map(|p| p.to_signed()))
                .push_bind(f.wife_id.map(|p| p.to_signed()))
                .push_bind(int(f.tile_id))
                .push_bind(f.pregnant)
                .push_bind(f.delivery_date.map(|d| d.to_string()))
                .push_bind(id_array(f.children.iter().map(|c| c.to_signed())));
        });
        qb.push(
            " ON CONFLICT (id) DO UPDATE SET husband_id = EXCLUDED.husband_id, \
             wife_id = EXCLUDED.wife_id, tile_id = EXCLUDED.tile_id, \
             pregnant = EXCLUDED.pregnant, delivery_date = EXCLUDED.delivery_date, \
             children_ids = EXCLUDED.children_ids",
        );
        qb.build().execute(&mut *conn).await?;
    }
    Ok(())
}

async fn upsert_villages(
    conn: &mut sqlx::PgConnection,
    villages: &[Village],
    chunk: usize,
) -> Result<(), sqlx::Error> {
    for rows in villages.chunks(chunk) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO villages (id, tile_id, land_chunk, cleared_chunks, housing_capacity, \
             occupant_ids, food_stores, food_capacity, food_production_rate) ",
        );
        qb.push_values(rows, |mut row, v| {
            row.push_bind(v.id.to_signed())
                .push_bind(int(v.tile_id))
                .push_bind(int(v.land_chunk))
                .push_bind(int(v.cleared_chunks))
                .push_bind(int(v.housing_capacity))
                .push_bind(id_array(v.occupants.iter().map(|p| p.to_signed())))
                .push_bind(v.food_stores)
                .push_bind(v.food_capacity)
                .push_bind(v.food_production_rate);
        });
        qb.push(
            " ON CONFLICT (id) DO UPDATE SET tile_id = EXCLUDED.tile_id, \
             land_chunk = EXCLUDED.land_chunk, cleared_chunks = EXCLUDED.cleared_chunks, \
             housing_capacity = EXCLUDED.housing_capacity, occupant_ids = EXCLUDED.occupant_ids, \
             food_stores = EXCLUDED.food_stores, food_capacity = EXCLUDED.food_capacity, \
             food_production_rate = EXCLUDED.food_production_rate",
        );
        qb.build().execute(&mut *conn).await?;
    }
    Ok(())
}

async fn delete_ids(
    conn: &mut sqlx::PgConnection,
    statement: &'static str,
    ids: &[u64],
) -> Result<(), sqlx::Error> {
    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query(statement)
        .bind(to_signed(ids))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

impl SequenceCounter for PgStore {
    async fn advance(&self, kind: EntityKind, by: u64) -> Result<u64, StoreError> {
        let value: Option<i64> = sqlx::query_scalar(
            "UPDATE id_counters SET value = value + $2 WHERE kind = $1 RETURNING value",
        )
        .bind(kind.as_str())
        .bind(by as i64)
        .fetch_optional(&self.pool)
        .await?;
        let value = value.ok_or(StoreError::MissingCounter(kind))?;
        u64::try_from(value)
            .map_err(|_| StoreError::MalformedRow(format!("{kind} counter is negative: {value}")))
    }

    async fn reset(&self, kind: EntityKind, origin: u64) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO id_counters (kind, value) VALUES ($1, $2) \
             ON CONFLICT (kind) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(kind.as_str())
        .bind(origin as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl DurableStore for PgStore {
    async fn persist(&self, batch: &PersistBatch) -> Result<(), StoreError> {
        if let Some(what) = batch.first_provisional() {
            return Err(StoreError::ProvisionalId(what));
        }
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        upsert_people(&mut *tx, &batch.people, self.chunk).await?;
        upsert_families(&mut *tx, &batch.families, self.chunk).await?;
        upsert_villages(&mut *tx, &batch.villages, self.chunk).await?;
        delete_ids(&mut *tx, "DELETE FROM villages WHERE id = ANY($1)", &batch.deleted_villages)
            .await?;
        delete_ids(&mut *tx, "DELETE FROM families WHERE id = ANY($1)", &batch.deleted_families)
            .await?;
        delete_ids(&mut *tx, "DELETE FROM people WHERE id = ANY($1)", &batch.deleted_people).await?;
        tx.commit().await?;

        debug!(
            people = batch.people.len(),
            families = batch.families.len(),
            villages = batch.villages.len(),
            deleted = batch.deleted_people.len()
                + batch.deleted_families.len()
                + batch.deleted_villages.len(),
            "committed reconciliation batch"
        );
        Ok(())
    }

    async fn replace_tiles(&self, tiles: &[Tile]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM tiles").execute(&mut *tx).await?;
        copy_tiles(&mut *tx, tiles, self.chunk).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        sqlx::query("TRUNCATE people, families, villages, tiles")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
