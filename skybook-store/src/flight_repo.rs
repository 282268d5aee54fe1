use async_trait::async_trait;
use uuid::Uuid;

use skybook_core::{Flight, FlightDirectory, Seat, StoreResult};

use crate::booking_repo::PostgresStore;
use crate::rows::{backend, convert_all, FlightRow, SeatRow};

#[async_trait]
impl FlightDirectory for PostgresStore {
    async fn flight(&self, flight_id: Uuid) -> StoreResult<Option<Flight>> {
        let row = sqlx::query_as::<_, FlightRow>(
            r#"
            SELECT id, flight_number, departure_time, arrival_time, status,
                   airplane_id, origin_airport_id, destination_airport_id
            FROM flights
            WHERE id = $1
            "#,
        )
        .bind(flight_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Flight::try_from).transpose()
    }

    async fn airplane_seats(&self, airplane_id: Uuid) -> StoreResult<Vec<Seat>> {
        let rows = sqlx::query_as::<_, SeatRow>(
            r#"
            SELECT id, airplane_id, seat_number, class, price, currency
            FROM seats
            WHERE airplane_id = $1
            ORDER BY seat_number
            "#,
        )
        .bind(airplane_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        convert_all(rows)
    }

    async fn seats(&self, seat_ids: &[Uuid]) -> StoreResult<Vec<Seat>> {
        if seat_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, SeatRow>(
            r#"
            SELECT id, airplane_id, seat_number, class, price, currency
            FROM seats
            WHERE id = ANY($1)
            "#,
        )
        .bind(seat_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        convert_all(rows)
    }
}
