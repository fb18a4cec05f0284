use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use fynmate_core::time::parse_wall_clock;
use fynmate_core::{Category, PaymentMethod, TimePolicy, TransactionRecord};
use fynmate_extract::{Normalizer, OfflineExtractor, Pipeline, Source};
use fynmate_ledger::server::{
    ApiError, MessageRequest, UidQuery, add_transaction, handle_message, list_today,
    list_transactions,
};
use fynmate_ledger::{AppState, RecordSink, SqliteStore};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn state() -> Arc<AppState> {
    let pipeline = Pipeline::new(
        Arc::new(OfflineExtractor),
        Normalizer::default(),
        TimePolicy::default(),
    );
    Arc::new(AppState {
        store: SqliteStore::open_in_memory().unwrap(),
        pipeline: Arc::new(pipeline),
    })
}

fn record(user_id: i64, amount: u64, created_at: &str) -> TransactionRecord {
    TransactionRecord {
        user_id,
        username: Some("ani".to_string()),
        note: "kopi".to_string(),
        category: Category::Food,
        amount,
        payment_method: PaymentMethod::Ovo,
        created_at: parse_wall_clock(created_at).unwrap(),
    }
}

#[tokio::test]
async fn test_post_echoes_record_and_get_lists_it() {
    let st = state();
    let rec = record(7, 20_000, "2026-02-18 08:00:00");

    let Json(resp) = add_transaction(State(st.clone()), Ok(Json(rec.clone())))
        .await
        .unwrap();
    assert_eq!(resp.status, "success");
    assert_eq!(resp.message, "Transaction added successfully");
    assert_eq!(resp.data, rec);

    let Json(list) = list_transactions(State(st.clone()), Query(UidQuery { uid: None }))
        .await
        .unwrap();
    assert_eq!(list.status, "success");
    assert_eq!(list.count, 1);
    assert_eq!(list.total_expense, 20_000);
    assert_eq!(list.data[0].record, rec);
}

#[tokio::test]
async fn test_uid_filter_and_totals() {
    let st = state();
    st.store.insert(&record(1, 10_000, "2026-02-18 08:00:00")).await.unwrap();
    st.store.insert(&record(1, 15_000, "2026-02-18 09:00:00")).await.unwrap();
    st.store.insert(&record(2, 99_000, "2026-02-18 10:00:00")).await.unwrap();

    let Json(list) = list_transactions(State(st.clone()), Query(UidQuery { uid: Some(1) }))
        .await
        .unwrap();
    assert_eq!(list.count, 2);
    assert_eq!(list.total_expense, 25_000);
    assert!(list.data.iter().all(|t| t.record.user_id == 1));
}

#[tokio::test]
async fn test_today_uses_local_calendar_day() {
    let st = state();
    let now = st.pipeline.policy().now();
    let mut today_rec = record(1, 12_000, "2020-01-01 00:00:00");
    today_rec.created_at = now;
    st.store.insert(&today_rec).await.unwrap();
    st.store.insert(&record(1, 50_000, "2020-01-01 12:00:00")).await.unwrap();

    let Json(list) = list_today(State(st.clone()), Query(UidQuery { uid: None }))
        .await
        .unwrap();
    assert_eq!(list.count, 1);
    assert_eq!(list.total_expense, 12_000);
}

#[tokio::test]
async fn test_message_endpoint_persists_accepted() {
    let st = state();
    let req = MessageRequest {
        user_id: 5,
        username: Some("budi".to_string()),
        text: "ngopi 25rb via ovo".to_string(),
    };

    let Json(resp) = handle_message(State(st.clone()), Ok(Json(req))).await.unwrap();
    assert_eq!(resp.status, "success");
    assert_eq!(resp.source, Some(Source::Fallback));
    assert!(resp.reply.contains("Rp 25,000"));

    let data = resp.data.unwrap();
    assert_eq!(data.amount, 25_000);
    assert_eq!(data.note, "ngopi 25rb via ovo");

    let stored = st.store.list(Some(5)).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].record, data);
}

#[tokio::test]
async fn test_message_endpoint_never_persists_rejections() {
    let st = state();
    let req = MessageRequest {
        user_id: 5,
        username: None,
        text: "halo apa kabar".to_string(),
    };

    let Json(resp) = handle_message(State(st.clone()), Ok(Json(req))).await.unwrap();
    assert_eq!(resp.status, "rejected");
    assert_eq!(resp.reply, fynmate_core::reply::REJECTION);
    assert!(resp.data.is_none());
    assert!(st.store.list(None).await.unwrap().is_empty());
}

#[test]
fn test_error_status_codes() {
    let invalid = ApiError::Invalid("missing field `amount`".to_string()).into_response();
    assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let ledger = ApiError::Ledger(fynmate_ledger::LedgerError::Lock).into_response();
    assert_eq!(ledger.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
