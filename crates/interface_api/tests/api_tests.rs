//! HTTP surface tests
//!
//! These run against a lazily connected pool, so every request exercised
//! here must be answered before the first query: authentication,
//! authorization and body validation. The `branch_isolation` tests are the
//! exception; they need Docker and are ignored by default.

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use core_kernel::{BranchId, UserId};
use infra_db::{create_lazy_pool, DatabaseConfig};
use interface_api::auth::{create_token, permissions};
use interface_api::config::ApiConfig;
use interface_api::create_router;

const SECRET: &str = "api-test-secret";

fn server() -> TestServer {
    let pool = create_lazy_pool(&DatabaseConfig::new("postgres://localhost/retail_core_test"))
        .unwrap();
    server_over(pool)
}

fn server_over(pool: sqlx::PgPool) -> TestServer {
    let config = ApiConfig {
        jwt_secret: SECRET.to_string(),
        ..ApiConfig::default()
    };
    TestServer::new(create_router(pool, config)).unwrap()
}

fn bearer(granted: &[&str]) -> HeaderValue {
    bearer_for(BranchId::new(1), granted)
}

fn bearer_for(branch_id: BranchId, granted: &[&str]) -> HeaderValue {
    let token = create_token(
        UserId::new(7),
        branch_id,
        vec!["cashier".to_string()],
        granted.iter().map(|p| p.to_string()).collect(),
        SECRET,
        300,
    )
    .unwrap();
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

mod health {
    use super::*;

    #[tokio::test]
    async fn test_liveness_needs_no_token() {
        let response = server().get("/health").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
    }
}

mod authentication {
    use super::*;

    #[tokio::test]
    async fn test_protected_route_without_token_is_unauthorized() {
        let response = server()
            .post("/api/v1/sales/checkout")
            .json(&json!({ "items": [] }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_unauthorized() {
        let token = create_token(UserId::new(1), BranchId::new(1), vec![], vec![], "other", 60)
            .unwrap();
        let response = server()
            .get("/api/v1/ledger/entries/1")
            .add_header(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
            )
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_permission_is_forbidden() {
        let response = server()
            .post("/api/v1/sales/checkout")
            .add_header(header::AUTHORIZATION, bearer(&[permissions::LEDGER_READ]))
            .json(&json!({ "items": [{ "product_id": 1, "qty": 1 }] }))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["error"], "forbidden");
    }
}

mod validation {
    use super::*;

    #[tokio::test]
    async fn test_empty_cart_is_rejected_before_pricing() {
        let response = server()
            .post("/api/v1/sales/checkout")
            .add_header(header::AUTHORIZATION, bearer(&[permissions::POS_CHECKOUT]))
            .json(&json!({ "items": [] }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json();
        assert_eq!(body["error"], "validation_error");
        assert!(body["details"][0].as_str().unwrap().starts_with("items"));
    }

    #[tokio::test]
    async fn test_negative_journal_amount_is_rejected() {
        let response = server()
            .post("/api/v1/ledger/entries")
            .add_header(header::AUTHORIZATION, bearer(&[permissions::LEDGER_WRITE]))
            .json(&json!({
                "currency": "USD",
                "description": "Correction",
                "lines": [
                    { "account_id": 1, "debit": "-10" },
                    { "account_id": 2, "credit": "-10" }
                ]
            }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_reversal_requires_reason() {
        let response = server()
            .post("/api/v1/ledger/entries/5/reverse")
            .add_header(header::AUTHORIZATION, bearer(&[permissions::LEDGER_REVERSE]))
            .json(&json!({ "reason": "" }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_unknown_source_kind_is_bad_request() {
        let response = server()
            .post("/api/v1/ledger/sources/invoice/3/entry")
            .add_header(header::AUTHORIZATION, bearer(&[permissions::LEDGER_WRITE]))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

mod audit {
    use super::*;

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let response = server()
            .post("/api/v1/pos/sessions")
            .add_header(header::AUTHORIZATION, bearer(&[permissions::POS_SESSION]))
            .add_header(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("till-4-0001"),
            )
            .json(&json!({ "opening_cash": "-5" }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.header("x-request-id"), "till-4-0001");
    }
}

mod branch_isolation {
    use super::*;
    use domain_ledger::{JournalLine, ManualEntryDraft, RetailChartOfAccounts as Chart};
    use infra_db::LedgerRepository;
    use rust_decimal_macros::dec;
    use test_utils::database::TestDatabase;
    use test_utils::{ActorFixtures, IdFixtures};

    #[tokio::test]
    #[ignore = "needs docker"]
    async fn test_entry_of_another_branch_is_not_found() {
        let db = TestDatabase::seeded().await.unwrap();
        let draft = ManualEntryDraft {
            currency: core_kernel::Currency::USD,
            entry_date: None,
            description: "Float top-up".to_string(),
            lines: vec![
                JournalLine::debit(Chart::CASH, dec!(50)),
                JournalLine::credit(Chart::RETAINED_EARNINGS, dec!(50)),
            ],
        };
        let entry = LedgerRepository::new(db.pool().clone())
            .create_manual_entry(draft, &ActorFixtures::accountant())
            .await
            .unwrap();
        let server = server_over(db.pool().clone());
        let path = format!("/api/v1/ledger/entries/{}", entry.id.value());

        let foreign = server
            .get(&path)
            .add_header(header::AUTHORIZATION, bearer_for(IdFixtures::OTHER_BRANCH, &[permissions::LEDGER_READ]))
            .await;
        foreign.assert_status(StatusCode::NOT_FOUND);

        let cancel = server
            .post(&format!("{path}/cancel"))
            .add_header(header::AUTHORIZATION, bearer_for(IdFixtures::OTHER_BRANCH, &[permissions::LEDGER_WRITE]))
            .await;
        cancel.assert_status(StatusCode::NOT_FOUND);

        let own = server
            .get(&path)
            .add_header(header::AUTHORIZATION, bearer_for(IdFixtures::BRANCH, &[permissions::LEDGER_READ]))
            .await;
        own.assert_status_ok();
        let body: Value = own.json();
        assert_eq!(body["status"], "draft");
    }
}
