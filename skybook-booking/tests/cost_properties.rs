mod common;

use common::{world, ALICE};
use proptest::prelude::*;
use skybook_core::Money;

fn layout(prices: &[i64]) -> Vec<(String, i64)> {
    prices
        .iter()
        .enumerate()
        .map(|(i, price)| (format!("{}A", i + 1), *price))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cost_is_sum_of_held_seats(
        prices in prop::collection::vec(1i64..2_000_000, 1..8),
        removals in 0usize..8,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let seats = layout(&prices);
            let borrowed: Vec<(&str, i64)> = seats.iter().map(|(n, p)| (n.as_str(), *p)).collect();
            let w = world(&borrowed);
            let all: Vec<usize> = (0..prices.len()).collect();

            let snapshot = w.services.bookings.create_booking(ALICE, w.request(&all)).await.unwrap();
            prop_assert_eq!(snapshot.cost.clone(), Money::new(prices.iter().sum(), "USD"));

            // drop passengers from the front, always keeping one
            let drop = removals.min(prices.len() - 1);
            for passenger in &snapshot.passengers[..drop] {
                w.services
                    .bookings
                    .remove_passenger(ALICE, snapshot.booking.id, passenger.id)
                    .await
                    .unwrap();
            }

            let expected: i64 = prices[drop..].iter().sum();
            let cost = w.services.bookings.booking_cost(ALICE, snapshot.booking.id).await.unwrap();
            prop_assert_eq!(cost, Money::new(expected, "USD"));
            Ok(())
        })?;
    }
}
