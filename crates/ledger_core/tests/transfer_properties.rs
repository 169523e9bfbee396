use ledger_core::db::open_db_in_memory;
use ledger_core::{LedgerStore, SqliteLedgerStore, TransferEngine, TransferError};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Total money across both accounts never changes, whatever the outcome.
    #[test]
    fn transfer_conserves_total_balance(
        source_cents in 0i64..100_000,
        destination_cents in 0i64..100_000,
        amount_cents in 1i64..150_000,
    ) {
        let mut conn = open_db_in_memory().unwrap();
        let (a, b) = {
            let store = SqliteLedgerStore::try_new(&conn).unwrap();
            (
                store.open_account(cents(source_cents)).unwrap().id,
                store.open_account(cents(destination_cents)).unwrap().id,
            )
        };
        let total_before = cents(source_cents + destination_cents);

        let outcome = TransferEngine::try_new(&mut conn)
            .unwrap()
            .transfer(a, b, cents(amount_cents));

        let store = SqliteLedgerStore::try_new(&conn).unwrap();
        let after_a = store.get_account(a).unwrap().balance;
        let after_b = store.get_account(b).unwrap().balance;
        prop_assert_eq!(after_a + after_b, total_before);
        prop_assert!(after_a >= Decimal::ZERO);

        let records = store.list_transactions().unwrap();
        match outcome {
            Ok(receipt) => {
                prop_assert!(amount_cents <= source_cents);
                prop_assert_eq!(after_a, cents(source_cents - amount_cents));
                prop_assert_eq!(records, vec![receipt.record]);
            }
            Err(TransferError::InsufficientFunds { .. }) => {
                prop_assert!(amount_cents > source_cents);
                prop_assert_eq!(after_a, cents(source_cents));
                prop_assert!(records.is_empty());
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}
