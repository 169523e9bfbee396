use ledger_core::db::open_db_in_memory;
use ledger_core::{LedgerStore, NewTransactionRecord, RepoError, SqliteLedgerStore};
use rust_decimal_macros::dec;

#[test]
fn open_and_get_account_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLedgerStore::try_new(&conn).unwrap();

    let opened = store.open_account(dec!(500.00)).unwrap();
    let loaded = store.get_account(opened.id).unwrap();

    assert_eq!(loaded, opened);
    assert_eq!(loaded.balance.to_string(), "500.00");
}

#[test]
fn get_account_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLedgerStore::try_new(&conn).unwrap();

    let err = store.get_account(404).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: "account",
            id: 404
        }
    ));
}

#[test]
fn set_balance_overwrites_and_rejects_unknown_account() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLedgerStore::try_new(&conn).unwrap();
    let account = store.open_account(dec!(10)).unwrap();

    store.set_balance(account.id, dec!(7.25)).unwrap();
    assert_eq!(store.get_account(account.id).unwrap().balance, dec!(7.25));

    let err = store.set_balance(account.id + 1, dec!(1)).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
}

#[test]
fn set_balance_inside_rolled_back_transaction_is_discarded() {
    let mut conn = open_db_in_memory().unwrap();
    let account_id = {
        let store = SqliteLedgerStore::try_new(&conn).unwrap();
        store.open_account(dec!(100)).unwrap().id
    };

    let tx = conn.transaction().unwrap();
    {
        let store = SqliteLedgerStore::try_new(&tx).unwrap();
        store.set_balance(account_id, dec!(1)).unwrap();
        assert_eq!(store.get_account(account_id).unwrap().balance, dec!(1));
    }
    tx.rollback().unwrap();

    let store = SqliteLedgerStore::try_new(&conn).unwrap();
    assert_eq!(store.get_account(account_id).unwrap().balance, dec!(100));
}

#[test]
fn transactions_are_listed_in_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLedgerStore::try_new(&conn).unwrap();
    let a = store.open_account(dec!(0)).unwrap();
    let b = store.open_account(dec!(0)).unwrap();

    let first = store
        .append_transaction(&NewTransactionRecord::new(a.id, b.id, dec!(3.00)))
        .unwrap();
    let second = store
        .append_transaction(&NewTransactionRecord::new(b.id, a.id, dec!(1.50)))
        .unwrap();

    let listed = store.list_transactions().unwrap();
    assert_eq!(listed, vec![first, second]);
    assert!(listed[0].id < listed[1].id);
}

#[test]
fn append_rejects_non_positive_amount() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLedgerStore::try_new(&conn).unwrap();
    let a = store.open_account(dec!(0)).unwrap();

    let err = store
        .append_transaction(&NewTransactionRecord::new(a.id, a.id, dec!(0)))
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
    assert!(store.list_transactions().unwrap().is_empty());
}

#[test]
fn transaction_log_is_append_only() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLedgerStore::try_new(&conn).unwrap();
    let a = store.open_account(dec!(0)).unwrap();
    let b = store.open_account(dec!(0)).unwrap();
    let record = store
        .append_transaction(&NewTransactionRecord::new(a.id, b.id, dec!(9.99)))
        .unwrap();

    let update = conn.execute(
        "UPDATE transactions SET amount_cents = 1 WHERE id = ?1;",
        [record.id],
    );
    assert!(update.is_err());

    let delete = conn.execute("DELETE FROM transactions WHERE id = ?1;", [record.id]);
    assert!(delete.is_err());

    assert_eq!(store.list_transactions().unwrap(), vec![record]);
}

#[test]
fn list_accounts_is_ordered_by_id() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLedgerStore::try_new(&conn).unwrap();
    let a = store.open_account(dec!(1)).unwrap();
    let b = store.open_account(dec!(2)).unwrap();

    assert_eq!(store.list_accounts().unwrap(), vec![a, b]);
}

#[test]
fn records_serialize_money_as_exact_strings() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteLedgerStore::try_new(&conn).unwrap();
    let a = store.open_account(dec!(12.30)).unwrap();
    let record = store
        .append_transaction(&NewTransactionRecord::new(a.id, a.id, dec!(0.10)))
        .unwrap();

    let account_json = serde_json::to_value(&a).unwrap();
    assert_eq!(account_json["balance"], "12.30");

    let record_json = serde_json::to_value(&record).unwrap();
    assert_eq!(record_json["amount"], "0.10");
    assert_eq!(record_json["from_account_id"], a.id);
}
