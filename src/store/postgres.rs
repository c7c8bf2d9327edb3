//! PostgreSQL store. Tables live in the schema named by `TRASY_SCHEMA`
//! (default `trasy`).
//!
//! Point mutations lock the parent route row (`SELECT ... FOR UPDATE`) before
//! reading its points, so two mutations of one route serialise while other
//! routes proceed. `UNIQUE (trasa_id, kolejnosc)` is deferred to commit time:
//! a swap briefly holds two equal orders inside its transaction.

use super::{AccountStore, RouteStore};
use crate::auth::generate_key;
use crate::error::AppError;
use crate::model::{
    BackgroundId, BackgroundImage, Direction, NewBackground, NewRoute, NewUser, PointChanges, PointId, Route,
    RouteChanges, RouteId, RoutePoint, User, UserId,
};
use crate::ordering::{self, OrderChange};
use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, PgConnection, PgPool};
use std::str::FromStr;

const BACKGROUND_COLUMNS: &str = "id, nazwa, opis, obraz, szerokosc, wysokosc, data_dodania";
const ROUTE_COLUMNS: &str = "id, nazwa, opis, uzytkownik_id, obraz_tla_id, data_utworzenia, data_modyfikacji";
const POINT_COLUMNS: &str = "id, trasa_id, x, y, kolejnosc";
const USER_COLUMNS: &str = "id, username, email, password_hash, date_joined";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    /// `schema` must already be a valid identifier; see `Settings::from_env`.
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgStore {
            pool,
            schema: schema.into(),
        }
    }

    /// Schema-qualified table name, e.g. `trasy.punkty_trasy`.
    fn table(&self, name: &str) -> String {
        format!("{}.{}", self.schema, name)
    }

    /// Create schema and tables if missing. Safe to run on every start.
    pub async fn ensure_tables(&self) -> Result<(), AppError> {
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", self.schema))
            .execute(&self.pool)
            .await?;

        let users = self.table("uzytkownicy");
        let tokens = self.table("tokeny");
        let sessions = self.table("sesje");
        let backgrounds = self.table("obrazy_tla");
        let routes = self.table("trasy");
        let points = self.table("punkty_trasy");

        let ddl = [
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {users} (
                    id BIGSERIAL PRIMARY KEY,
                    username TEXT NOT NULL UNIQUE,
                    email TEXT NOT NULL DEFAULT '',
                    password_hash TEXT NOT NULL,
                    date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {tokens} (
                    klucz TEXT PRIMARY KEY,
                    uzytkownik_id BIGINT NOT NULL UNIQUE REFERENCES {users}(id) ON DELETE CASCADE,
                    utworzony TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {sessions} (
                    klucz TEXT PRIMARY KEY,
                    uzytkownik_id BIGINT NOT NULL REFERENCES {users}(id) ON DELETE CASCADE,
                    utworzona TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {backgrounds} (
                    id BIGSERIAL PRIMARY KEY,
                    nazwa VARCHAR(100) NOT NULL,
                    opis TEXT NOT NULL DEFAULT '',
                    obraz TEXT NOT NULL,
                    szerokosc INTEGER NOT NULL,
                    wysokosc INTEGER NOT NULL,
                    data_dodania TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {routes} (
                    id BIGSERIAL PRIMARY KEY,
                    nazwa VARCHAR(100) NOT NULL,
                    opis TEXT NOT NULL DEFAULT '',
                    uzytkownik_id BIGINT NOT NULL REFERENCES {users}(id) ON DELETE CASCADE,
                    obraz_tla_id BIGINT NOT NULL REFERENCES {backgrounds}(id) ON DELETE CASCADE,
                    data_utworzenia TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    data_modyfikacji TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {points} (
                    id BIGSERIAL PRIMARY KEY,
                    trasa_id BIGINT NOT NULL REFERENCES {routes}(id) ON DELETE CASCADE,
                    x INTEGER NOT NULL,
                    y INTEGER NOT NULL,
                    kolejnosc INTEGER NOT NULL CHECK (kolejnosc >= 1),
                    CONSTRAINT punkty_trasy_kolejnosc_uniq UNIQUE (trasa_id, kolejnosc) DEFERRABLE INITIALLY DEFERRED
                )
                "#
            ),
            format!("CREATE INDEX IF NOT EXISTS trasy_uzytkownik_idx ON {routes} (uzytkownik_id)"),
        ];
        for sql in &ddl {
            tracing::debug!(sql = %sql, "ddl");
            sqlx::query(sql).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Lock the route row for the rest of the transaction.
    async fn lock_route(&self, tx: &mut PgConnection, route_id: RouteId) -> Result<(), AppError> {
        let sql = format!("SELECT id FROM {} WHERE id = $1 FOR UPDATE", self.table("trasy"));
        tracing::debug!(sql = %sql, route_id, "query (tx)");
        let locked: Option<(i64,)> = sqlx::query_as(&sql).bind(route_id).fetch_optional(&mut *tx).await?;
        locked
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("trasa {}", route_id)))
    }

    async fn points_tx(&self, tx: &mut PgConnection, route_id: RouteId) -> Result<Vec<RoutePoint>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE trasa_id = $1 ORDER BY kolejnosc",
            POINT_COLUMNS,
            self.table("punkty_trasy")
        );
        tracing::debug!(sql = %sql, route_id, "query (tx)");
        Ok(sqlx::query_as::<_, RoutePoint>(&sql)
            .bind(route_id)
            .fetch_all(&mut *tx)
            .await?)
    }

    /// One statement for the whole plan; no per-row saves.
    async fn apply_tx(
        &self,
        tx: &mut PgConnection,
        route_id: RouteId,
        changes: &[OrderChange],
    ) -> Result<(), AppError> {
        if changes.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = changes.iter().map(|c| c.point_id).collect();
        let orders: Vec<i32> = changes.iter().map(|c| c.order).collect();
        let sql = format!(
            "UPDATE {} AS p SET kolejnosc = c.kolejnosc \
             FROM UNNEST($1::BIGINT[], $2::INTEGER[]) AS c(id, kolejnosc) \
             WHERE p.id = c.id AND p.trasa_id = $3",
            self.table("punkty_trasy")
        );
        tracing::debug!(sql = %sql, ids = ?ids, orders = ?orders, "query (tx)");
        sqlx::query(&sql)
            .bind(&ids)
            .bind(&orders)
            .bind(route_id)
            .execute(&mut *tx)
            .await?;
        Ok(())
    }

    async fn user_by_key(&self, table: &str, key: &str) -> Result<Option<User>, AppError> {
        let sql = format!(
            "SELECT u.id, u.username, u.email, u.password_hash, u.date_joined FROM {} u \
             JOIN {} k ON k.uzytkownik_id = u.id WHERE k.klucz = $1",
            self.table("uzytkownicy"),
            self.table(table)
        );
        tracing::debug!(sql = %sql, "query");
        Ok(sqlx::query_as::<_, User>(&sql).bind(key).fetch_optional(&self.pool).await?)
    }
}

/// Maps a foreign key violation on the background reference to a field error.
fn background_reference(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            AppError::validation("obraz_tla", "Unknown background image.")
        }
        _ => AppError::Db(err),
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO {} (username, email, password_hash) VALUES ($1, $2, $3) \
             ON CONFLICT (username) DO NOTHING RETURNING {}",
            self.table("uzytkownicy"),
            USER_COLUMNS
        );
        tracing::debug!(sql = %sql, username = %new.username, "query");
        sqlx::query_as::<_, User>(&sql)
            .bind(&new.username)
            .bind(&new.email)
            .bind(&new.password_hash)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::validation("username", "A user with that username already exists."))
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM {} WHERE username = $1", USER_COLUMNS, self.table("uzytkownicy"));
        tracing::debug!(sql = %sql, "query");
        Ok(sqlx::query_as::<_, User>(&sql).bind(username).fetch_optional(&self.pool).await?)
    }

    async fn token_for_user(&self, user_id: UserId) -> Result<String, AppError> {
        let table = self.table("tokeny");
        let insert = format!(
            "INSERT INTO {} (klucz, uzytkownik_id) VALUES ($1, $2) ON CONFLICT (uzytkownik_id) DO NOTHING",
            table
        );
        sqlx::query(&insert)
            .bind(generate_key())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        let select = format!("SELECT klucz FROM {} WHERE uzytkownik_id = $1", table);
        let (key,): (String,) = sqlx::query_as(&select).bind(user_id).fetch_one(&self.pool).await?;
        Ok(key)
    }

    async fn user_by_token(&self, key: &str) -> Result<Option<User>, AppError> {
        self.user_by_key("tokeny", key).await
    }

    async fn create_session(&self, user_id: UserId) -> Result<String, AppError> {
        let key = generate_key();
        let sql = format!("INSERT INTO {} (klucz, uzytkownik_id) VALUES ($1, $2)", self.table("sesje"));
        sqlx::query(&sql).bind(&key).bind(user_id).execute(&self.pool).await?;
        Ok(key)
    }

    async fn user_by_session(&self, key: &str) -> Result<Option<User>, AppError> {
        self.user_by_key("sesje", key).await
    }

    async fn delete_session(&self, key: &str) -> Result<(), AppError> {
        let sql = format!("DELETE FROM {} WHERE klucz = $1", self.table("sesje"));
        sqlx::query(&sql).bind(key).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RouteStore for PgStore {
    async fn create_background(&self, new: NewBackground) -> Result<BackgroundImage, AppError> {
        let sql = format!(
            "INSERT INTO {} (nazwa, opis, obraz, szerokosc, wysokosc) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            self.table("obrazy_tla"),
            BACKGROUND_COLUMNS
        );
        tracing::debug!(sql = %sql, "query");
        Ok(sqlx::query_as::<_, BackgroundImage>(&sql)
            .bind(&new.name)
            .bind(&new.description)
            .bind(&new.image)
            .bind(new.width)
            .bind(new.height)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_backgrounds(&self) -> Result<Vec<BackgroundImage>, AppError> {
        let sql = format!("SELECT {} FROM {} ORDER BY id", BACKGROUND_COLUMNS, self.table("obrazy_tla"));
        tracing::debug!(sql = %sql, "query");
        Ok(sqlx::query_as::<_, BackgroundImage>(&sql).fetch_all(&self.pool).await?)
    }

    async fn background(&self, id: BackgroundId) -> Result<Option<BackgroundImage>, AppError> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", BACKGROUND_COLUMNS, self.table("obrazy_tla"));
        tracing::debug!(sql = %sql, id, "query");
        Ok(sqlx::query_as::<_, BackgroundImage>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn delete_background(&self, id: BackgroundId) -> Result<(), AppError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table("obrazy_tla"));
        sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn create_route(&self, owner: UserId, new: NewRoute) -> Result<Route, AppError> {
        let sql = format!(
            "INSERT INTO {} (nazwa, opis, uzytkownik_id, obraz_tla_id) VALUES ($1, $2, $3, $4) RETURNING {}",
            self.table("trasy"),
            ROUTE_COLUMNS
        );
        tracing::debug!(sql = %sql, owner, "query");
        sqlx::query_as::<_, Route>(&sql)
            .bind(&new.name)
            .bind(&new.description)
            .bind(owner)
            .bind(new.background_id)
            .fetch_one(&self.pool)
            .await
            .map_err(background_reference)
    }

    async fn routes_of(&self, owner: UserId) -> Result<Vec<Route>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE uzytkownik_id = $1 ORDER BY id",
            ROUTE_COLUMNS,
            self.table("trasy")
        );
        tracing::debug!(sql = %sql, owner, "query");
        Ok(sqlx::query_as::<_, Route>(&sql).bind(owner).fetch_all(&self.pool).await?)
    }

    async fn owned_route(&self, route_id: RouteId, owner: UserId) -> Result<Option<Route>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1 AND uzytkownik_id = $2",
            ROUTE_COLUMNS,
            self.table("trasy")
        );
        tracing::debug!(sql = %sql, route_id, owner, "query");
        Ok(sqlx::query_as::<_, Route>(&sql)
            .bind(route_id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_route(&self, route_id: RouteId, changes: RouteChanges) -> Result<Route, AppError> {
        let sql = format!(
            "UPDATE {} SET nazwa = COALESCE($2, nazwa), opis = COALESCE($3, opis), \
             obraz_tla_id = COALESCE($4, obraz_tla_id), data_modyfikacji = NOW() \
             WHERE id = $1 RETURNING {}",
            self.table("trasy"),
            ROUTE_COLUMNS
        );
        tracing::debug!(sql = %sql, route_id, "query");
        sqlx::query_as::<_, Route>(&sql)
            .bind(route_id)
            .bind(changes.name)
            .bind(changes.description)
            .bind(changes.background_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(background_reference)?
            .ok_or_else(|| AppError::NotFound(format!("trasa {}", route_id)))
    }

    async fn delete_route(&self, route_id: RouteId) -> Result<(), AppError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table("trasy"));
        sqlx::query(&sql).bind(route_id).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_points(&self, route_id: RouteId) -> Result<Vec<RoutePoint>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE trasa_id = $1 ORDER BY kolejnosc",
            POINT_COLUMNS,
            self.table("punkty_trasy")
        );
        tracing::debug!(sql = %sql, route_id, "query");
        Ok(sqlx::query_as::<_, RoutePoint>(&sql).bind(route_id).fetch_all(&self.pool).await?)
    }

    async fn owned_point(&self, point_id: PointId, owner: UserId) -> Result<Option<RoutePoint>, AppError> {
        let sql = format!(
            "SELECT p.id, p.trasa_id, p.x, p.y, p.kolejnosc FROM {} p \
             JOIN {} t ON t.id = p.trasa_id WHERE p.id = $1 AND t.uzytkownik_id = $2",
            self.table("punkty_trasy"),
            self.table("trasy")
        );
        tracing::debug!(sql = %sql, point_id, owner, "query");
        Ok(sqlx::query_as::<_, RoutePoint>(&sql)
            .bind(point_id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_point_coords(&self, point_id: PointId, changes: PointChanges) -> Result<RoutePoint, AppError> {
        let sql = format!(
            "UPDATE {} SET x = COALESCE($2, x), y = COALESCE($3, y) WHERE id = $1 RETURNING {}",
            self.table("punkty_trasy"),
            POINT_COLUMNS
        );
        tracing::debug!(sql = %sql, point_id, "query");
        sqlx::query_as::<_, RoutePoint>(&sql)
            .bind(point_id)
            .bind(changes.x)
            .bind(changes.y)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("punkt {}", point_id)))
    }

    async fn apply_order_changes(&self, route_id: RouteId, changes: &[OrderChange]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        self.lock_route(&mut tx, route_id).await?;
        let points = self.points_tx(&mut tx, route_id).await?;
        if !ordering::plan_keeps_dense(&points, changes) {
            tracing::warn!(route = route_id, changes = ?changes, "rejected order plan");
            return Err(AppError::BadRequest(format!("order plan for trasa {} breaks 1..N", route_id)));
        }
        self.apply_tx(&mut tx, route_id, changes).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn append_point(&self, route_id: RouteId, x: i32, y: i32) -> Result<RoutePoint, AppError> {
        let mut tx = self.pool.begin().await?;
        self.lock_route(&mut tx, route_id).await?;
        let existing = self.points_tx(&mut tx, route_id).await?;
        let new = ordering::append(route_id, &existing, x, y);
        let sql = format!(
            "INSERT INTO {} (trasa_id, x, y, kolejnosc) VALUES ($1, $2, $3, $4) RETURNING {}",
            self.table("punkty_trasy"),
            POINT_COLUMNS
        );
        tracing::debug!(sql = %sql, route_id, order = new.order, "query (tx)");
        let point = sqlx::query_as::<_, RoutePoint>(&sql)
            .bind(new.route_id)
            .bind(new.x)
            .bind(new.y)
            .bind(new.order)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(point)
    }

    async fn delete_point(&self, point: &RoutePoint) -> Result<Vec<RoutePoint>, AppError> {
        let mut tx = self.pool.begin().await?;
        self.lock_route(&mut tx, point.route_id).await?;
        let current = self.points_tx(&mut tx, point.route_id).await?;
        if !current.iter().any(|p| p.id == point.id) {
            return Err(AppError::NotFound(format!("punkt {}", point.id)));
        }
        let plan = ordering::delete(&current, point.id);
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table("punkty_trasy"));
        sqlx::query(&sql).bind(point.id).execute(&mut *tx).await?;
        self.apply_tx(&mut tx, point.route_id, &plan).await?;
        let remaining = self.points_tx(&mut tx, point.route_id).await?;
        tx.commit().await?;
        Ok(remaining)
    }

    async fn swap_point(&self, point: &RoutePoint, direction: Direction) -> Result<Vec<RoutePoint>, AppError> {
        let mut tx = self.pool.begin().await?;
        self.lock_route(&mut tx, point.route_id).await?;
        let current = self.points_tx(&mut tx, point.route_id).await?;
        let plan = ordering::swap_adjacent(&current, point.id, direction);
        self.apply_tx(&mut tx, point.route_id, &plan).await?;
        let points = self.points_tx(&mut tx, point.route_id).await?;
        tx.commit().await?;
        Ok(points)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

/// Create the database named in `database_url` if it does not exist yet.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin, db_name) = admin_options(database_url)?;
    let Some(db_name) = db_name.filter(|name| name != "postgres") else {
        return Ok(());
    };
    let mut conn: PgConnection = admin.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name.replace('"', "\"\"")))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// Options for the `postgres` maintenance database on the same server, plus
/// the database named by `url`.
fn admin_options(url: &str) -> Result<(PgConnectOptions, Option<String>), AppError> {
    let opts = PgConnectOptions::from_str(url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let db_name = opts.get_database().map(str::to_string).filter(|name| !name.is_empty());
    Ok((opts.database("postgres"), db_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("postgres://localhost/trasy", "localhost", "trasy")]
    #[case("postgres://u:p@db:5432/app?sslmode=disable", "db", "app")]
    #[case("postgres://u:p@db:5432/app?sslrootcert=/etc/ssl/ca.pem", "db", "app")]
    fn admin_options_point_at_the_maintenance_database(#[case] url: &str, #[case] host: &str, #[case] name: &str) {
        let (admin, db_name) = admin_options(url).unwrap();
        assert_eq!(db_name.as_deref(), Some(name));
        assert_eq!(admin.get_database(), Some("postgres"));
        assert_eq!(admin.get_host(), host);
    }

    #[test]
    fn url_without_a_path_does_not_name_the_host_as_database() {
        let (_, db_name) = admin_options("postgres://localhost").unwrap();
        assert_ne!(db_name.as_deref(), Some("localhost"));
    }

    #[test]
    fn malformed_url_is_rejected() {
        assert!(matches!(admin_options("not a url"), Err(AppError::BadRequest(_))));
    }
}
