use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{CustomerId, PaymentId, ReservationId, VehicleId};
use domain::{
    Customer, DateRange, Money, Payment, PaymentStatus, Reservation, ReservationStatus, Role,
    Vehicle,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{BookingOutcome, RentalStore},
};

const VEHICLE_COLUMNS: &str = "id, agency, brand, model, daily_rate_cents, available";
const CUSTOMER_COLUMNS: &str = "id, full_name, email, phone, role, national_id, created_at";
const RESERVATION_COLUMNS: &str =
    "id, customer_id, vehicle_id, start_date, end_date, total_cents, status, created_at";
const PAYMENT_COLUMNS: &str = "id, reservation_id, amount_cents, card_reference, status, created_at";

/// PostgreSQL-backed rental store implementation.
///
/// Guarded writes lock the vehicle row (`SELECT ... FOR UPDATE`) first, so
/// two bookings of the same vehicle serialize on it.
#[derive(Clone)]
pub struct PostgresRentalStore {
    pool: PgPool,
}

impl PostgresRentalStore {
    /// Creates a new PostgreSQL rental store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("rental store migrations applied");
        Ok(())
    }

    fn row_to_vehicle(row: PgRow) -> Result<Vehicle> {
        Ok(Vehicle {
            id: VehicleId::from_uuid(row.try_get::<Uuid, _>("id")?),
            agency: row.try_get("agency")?,
            brand: row.try_get("brand")?,
            model: row.try_get("model")?,
            daily_rate: Money::from_cents(row.try_get("daily_rate_cents")?),
            available: row.try_get("available")?,
        })
    }

    fn row_to_customer(row: PgRow) -> Result<Customer> {
        let role: String = row.try_get("role")?;
        Ok(Customer {
            id: CustomerId::from_uuid(row.try_get::<Uuid, _>("id")?),
            full_name: row.try_get("full_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            role: role.parse::<Role>()?,
            national_id: row.try_get("national_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_reservation(row: PgRow) -> Result<Reservation> {
        let status: String = row.try_get("status")?;
        Ok(Reservation {
            id: ReservationId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            vehicle_id: VehicleId::from_uuid(row.try_get::<Uuid, _>("vehicle_id")?),
            period: DateRange::new(row.try_get("start_date")?, row.try_get("end_date")?)?,
            total: Money::from_cents(row.try_get("total_cents")?),
            status: status.parse::<ReservationStatus>()?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_payment(row: PgRow) -> Result<Payment> {
        let status: String = row.try_get("status")?;
        Ok(Payment {
            id: PaymentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            reservation_id: ReservationId::from_uuid(row.try_get::<Uuid, _>("reservation_id")?),
            amount: Money::from_cents(row.try_get("amount_cents")?),
            card_reference: row.try_get("card_reference")?,
            status: status.parse::<PaymentStatus>()?,
            created_at: row.try_get("created_at")?,
        })
    }

    /// Locks the vehicle row for the rest of the transaction.
    async fn lock_vehicle(
        tx: &mut Transaction<'_, Postgres>,
        vehicle_id: VehicleId,
    ) -> Result<Option<bool>> {
        let available: Option<bool> =
            sqlx::query_scalar("SELECT available FROM vehicles WHERE id = $1 FOR UPDATE")
                .bind(vehicle_id.as_uuid())
                .fetch_optional(&mut **tx)
                .await?;
        Ok(available)
    }

    /// Returns the stored status of a reservation, locking its row.
    async fn lock_reservation_status(
        tx: &mut Transaction<'_, Postgres>,
        id: ReservationId,
    ) -> Result<String> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM reservations WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut **tx)
                .await?;
        status.ok_or_else(|| StoreError::NotFound {
            entity: "reservation",
            id: id.to_string(),
        })
    }

    /// Returns the stored status of a payment, locking its row.
    async fn lock_payment_status(
        tx: &mut Transaction<'_, Postgres>,
        id: PaymentId,
    ) -> Result<String> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM payments WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut **tx)
                .await?;
        status.ok_or_else(|| StoreError::NotFound {
            entity: "payment",
            id: id.to_string(),
        })
    }

    async fn write_reservation_status(
        tx: &mut Transaction<'_, Postgres>,
        reservation: &Reservation,
    ) -> Result<()> {
        sqlx::query("UPDATE reservations SET status = $2 WHERE id = $1")
            .bind(reservation.id.as_uuid())
            .bind(reservation.status.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn write_payment_status(
        tx: &mut Transaction<'_, Postgres>,
        payment: &Payment,
    ) -> Result<()> {
        sqlx::query("UPDATE payments SET status = $2 WHERE id = $1")
            .bind(payment.id.as_uuid())
            .bind(payment.status.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RentalStore for PostgresRentalStore {
    async fn save_vehicle(&self, vehicle: &Vehicle) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO vehicles (id, agency, brand, model, daily_rate_cents, available)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                agency = EXCLUDED.agency,
                brand = EXCLUDED.brand,
                model = EXCLUDED.model,
                daily_rate_cents = EXCLUDED.daily_rate_cents,
                available = EXCLUDED.available
            "#,
        )
        .bind(vehicle.id.as_uuid())
        .bind(&vehicle.agency)
        .bind(&vehicle.brand)
        .bind(&vehicle.model)
        .bind(vehicle.daily_rate.cents())
        .bind(vehicle.available)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_vehicle).transpose()
    }

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles ORDER BY brand ASC, model ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.into_iter().map(Self::row_to_vehicle).collect()
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, full_name, email, phone, role, national_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(customer.id.as_uuid())
        .bind(&customer.full_name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.role.as_str())
        .bind(&customer.national_id)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_customer_email")
            {
                return StoreError::DuplicateEmail(customer.email.clone());
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_customer).transpose()
    }

    async fn email_registered(&self, email: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM customers WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn get_reservation(&self, id: ReservationId) -> Result<Option<Reservation>> {
        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_reservation).transpose()
    }

    async fn reservations_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Reservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE customer_id = $1 ORDER BY created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(customer_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_reservation).collect()
    }

    async fn overlapping_reservations(
        &self,
        vehicle_id: VehicleId,
        period: DateRange,
    ) -> Result<Vec<Reservation>> {
        let sql = format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
            WHERE vehicle_id = $1
              AND status <> 'CANCELLED'
              AND start_date <= $3
              AND end_date >= $2
            ORDER BY start_date ASC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(vehicle_id.as_uuid())
            .bind(period.start())
            .bind(period.end())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_reservation).collect()
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn payment_for_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE reservation_id = $1");
        let row = sqlx::query(&sql)
            .bind(reservation_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn list_payments(&self) -> Result<Vec<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY created_at ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.into_iter().map(Self::row_to_payment).collect()
    }

    async fn stale_pending_payments(&self, cutoff: DateTime<Utc>) -> Result<Vec<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE status = 'PENDING' AND created_at < $1 ORDER BY created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_payment).collect()
    }

    async fn insert_pending(&self, reservation: &Reservation, payment: &Payment) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let available = Self::lock_vehicle(&mut tx, reservation.vehicle_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "vehicle",
                id: reservation.vehicle_id.to_string(),
            })?;
        if !available {
            tracing::debug!(vehicle_id = %reservation.vehicle_id, "vehicle flagged unavailable");
            return Err(StoreError::VehicleConflict(reservation.vehicle_id));
        }

        // Re-run the overlap query now that the vehicle row is held
        let overlap: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM reservations
                WHERE vehicle_id = $1
                  AND status <> 'CANCELLED'
                  AND start_date <= $3
                  AND end_date >= $2
            )
            "#,
        )
        .bind(reservation.vehicle_id.as_uuid())
        .bind(reservation.period.start())
        .bind(reservation.period.end())
        .fetch_one(&mut *tx)
        .await?;
        if overlap {
            tracing::debug!(
                vehicle_id = %reservation.vehicle_id,
                period = %reservation.period,
                "overlapping reservation exists"
            );
            return Err(StoreError::VehicleConflict(reservation.vehicle_id));
        }

        sqlx::query(
            r#"
            INSERT INTO reservations (id, customer_id, vehicle_id, start_date, end_date, total_cents, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(reservation.id.as_uuid())
        .bind(reservation.customer_id.as_uuid())
        .bind(reservation.vehicle_id.as_uuid())
        .bind(reservation.period.start())
        .bind(reservation.period.end())
        .bind(reservation.total.cents())
        .bind(reservation.status.as_str())
        .bind(reservation.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO payments (id, reservation_id, amount_cents, card_reference, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.reservation_id.as_uuid())
        .bind(payment.amount.cents())
        .bind(&payment.card_reference)
        .bind(payment.status.as_str())
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn commit_outcome(&self, outcome: BookingOutcome<'_>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        Self::lock_vehicle(&mut tx, outcome.reservation.vehicle_id).await?;

        let actual = Self::lock_reservation_status(&mut tx, outcome.reservation.id).await?;
        if actual != ReservationStatus::Pending.as_str() {
            return Err(StoreError::StaleState {
                entity: "reservation",
                id: outcome.reservation.id.to_string(),
                expected: ReservationStatus::Pending.as_str(),
                actual,
            });
        }
        let actual = Self::lock_payment_status(&mut tx, outcome.payment.id).await?;
        if actual != PaymentStatus::Pending.as_str() {
            return Err(StoreError::StaleState {
                entity: "payment",
                id: outcome.payment.id.to_string(),
                expected: PaymentStatus::Pending.as_str(),
                actual,
            });
        }

        Self::write_reservation_status(&mut tx, outcome.reservation).await?;
        Self::write_payment_status(&mut tx, outcome.payment).await?;

        if let Some(available) = outcome.vehicle_available {
            sqlx::query("UPDATE vehicles SET available = $2 WHERE id = $1")
                .bind(outcome.reservation.vehicle_id.as_uuid())
                .bind(available)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn close_reservation(
        &self,
        reservation: &Reservation,
        expected: ReservationStatus,
        today: NaiveDate,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let vehicle_exists = Self::lock_vehicle(&mut tx, reservation.vehicle_id)
            .await?
            .is_some();

        let actual = Self::lock_reservation_status(&mut tx, reservation.id).await?;
        if actual != expected.as_str() {
            return Err(StoreError::StaleState {
                entity: "reservation",
                id: reservation.id.to_string(),
                expected: expected.as_str(),
                actual,
            });
        }

        Self::write_reservation_status(&mut tx, reservation).await?;

        let still_held: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM reservations
                WHERE vehicle_id = $1
                  AND id <> $2
                  AND status = 'CONFIRMED'
                  AND end_date >= $3
            )
            "#,
        )
        .bind(reservation.vehicle_id.as_uuid())
        .bind(reservation.id.as_uuid())
        .bind(today)
        .fetch_one(&mut *tx)
        .await?;

        let released = vehicle_exists && !still_held;
        if released {
            sqlx::query("UPDATE vehicles SET available = TRUE WHERE id = $1")
                .bind(reservation.vehicle_id.as_uuid())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(released)
    }

    async fn update_payment(&self, payment: &Payment, expected: PaymentStatus) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let actual = Self::lock_payment_status(&mut tx, payment.id).await?;
        if actual != expected.as_str() {
            return Err(StoreError::StaleState {
                entity: "payment",
                id: payment.id.to_string(),
                expected: expected.as_str(),
                actual,
            });
        }
        Self::write_payment_status(&mut tx, payment).await?;

        tx.commit().await?;
        Ok(())
    }
}
