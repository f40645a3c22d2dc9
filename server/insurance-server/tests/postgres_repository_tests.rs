//! PostgreSQL repository tests
//!
//! Run against a disposable database:
//! `INSURANCE_TEST_DATABASE_URL=postgresql://... cargo test --test postgres_repository_tests`.
//! Each test returns early when the variable is unset.

use chrono::NaiveDate;
use database_layer::{run_migrations, DatabaseConfig, DatabasePool};
use insurance_service::{
    DateFilter, InsuranceDetailsQuery, InsuranceError, InsuranceRepository, NewInsuranceDetails,
    NewInsuranceProvider, PgInsuranceRepository, ProviderChanges,
};

const DATABASE_URL_VAR: &str = "INSURANCE_TEST_DATABASE_URL";

async fn repository() -> Option<(PgInsuranceRepository, DatabasePool)> {
    let url = std::env::var(DATABASE_URL_VAR).ok()?;
    let config = DatabaseConfig {
        url,
        max_connections: 5,
        ..DatabaseConfig::default()
    };
    let pool = DatabasePool::new(&config).await.unwrap();
    run_migrations(&pool).await.unwrap();
    Some((PgInsuranceRepository::new(pool.clone()), pool))
}

struct Seeded {
    provider_id: i64,
    recipient_id: i64,
    doctor_id: i64,
}

async fn seed(pool: &DatabasePool, recipient_name: &str) -> Seeded {
    let provider_id: i64 = sqlx::query_scalar(
        "INSERT INTO insurance_providers (provider_name) VALUES ('Test Payer') RETURNING id",
    )
    .fetch_one(pool.pool())
    .await
    .unwrap();
    let recipient_id: i64 = sqlx::query_scalar(
        "INSERT INTO insurance_recipients (name, receipient_ma) VALUES ($1, $2) RETURNING id",
    )
    .bind(recipient_name)
    .bind(uuid::Uuid::new_v4().simple().to_string())
    .fetch_one(pool.pool())
    .await
    .unwrap();
    let doctor_id: i64 = sqlx::query_scalar(
        "INSERT INTO doctor_details (doctor_name, doctor_phone_no) VALUES ('Dr. Test', '555-0100') RETURNING id",
    )
    .fetch_one(pool.pool())
    .await
    .unwrap();

    Seeded {
        provider_id,
        recipient_id,
        doctor_id,
    }
}

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

fn details(seeded: &Seeded, from: &str, to: &str) -> NewInsuranceDetails {
    NewInsuranceDetails {
        provider_id: seeded.provider_id,
        recipient_id: seeded.recipient_id,
        doctor_id: seeded.doctor_id,
        prsrb_prov: None,
        pa: Some("PA-1".to_string()),
        from_service_date: date(from),
        to_service_date: date(to),
        recipient_is: None,
        procedure_code: Some("T1019".to_string()),
        units: Some(8),
        plan_of_care: None,
        number_of_days: None,
        max_per_day: None,
        max_per_day_unit: None,
        insurance_status: None,
        mmis_entry: None,
        rsn: None,
        comment_pa: None,
    }
}

#[tokio::test]
async fn test_create_supersedes_overlapping_rows() {
    let Some((repo, pool)) = repository().await else {
        return;
    };
    let seeded = seed(&pool, "Supersession Recipient").await;

    let first = repo
        .create_detail(details(&seeded, "2024-01-01", "2024-01-31"))
        .await
        .unwrap();
    let second = repo
        .create_detail(details(&seeded, "2024-01-31", "2024-02-29"))
        .await
        .unwrap();

    assert_eq!(second.superseded, vec![first.record.id]);
    let old = repo.find_detail(first.record.id).await.unwrap().unwrap();
    assert!(!old.details.is_active);
    assert_eq!(old.doctor_number.as_deref(), Some("555-0100"));
}

#[tokio::test]
async fn test_unknown_recipient_is_a_validation_error() {
    let Some((repo, pool)) = repository().await else {
        return;
    };
    let mut seeded = seed(&pool, "Unknown Recipient").await;
    seeded.recipient_id = i64::MAX;

    let err = repo
        .create_detail(details(&seeded, "2024-01-01", "2024-01-31"))
        .await
        .unwrap_err();
    assert!(matches!(err, InsuranceError::Validation(_)));
}

#[tokio::test]
async fn test_listing_filters_and_counts() {
    let Some((repo, pool)) = repository().await else {
        return;
    };
    let name = format!("Listing {}", uuid::Uuid::new_v4().simple());
    let seeded = seed(&pool, &name).await;
    for day in 1..=3 {
        let day = format!("2024-04-0{day}");
        repo.create_detail(details(&seeded, &day, &day)).await.unwrap();
    }

    let query = InsuranceDetailsQuery {
        search_term: Some(name.clone()),
        date_filter: DateFilter::OnOrAfter(date("2024-04-02")),
        records_per_page: 1,
        page: 2,
        ..InsuranceDetailsQuery::default()
    };
    let (rows, total) = repo.list_details(&query).await.unwrap();

    assert_eq!(total, 2);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].details.from_service_date, date("2024-04-03"));
    assert_eq!(rows[0].recipient_name, name);
}

#[tokio::test]
async fn test_default_provider_is_unique() {
    let Some((repo, _pool)) = repository().await else {
        return;
    };

    let first = repo
        .create_provider(NewInsuranceProvider {
            provider_name: "First Default".to_string(),
            is_default: true,
            ..NewInsuranceProvider::default()
        })
        .await
        .unwrap();
    let second = repo
        .create_provider(NewInsuranceProvider {
            provider_name: "Second Default".to_string(),
            is_default: true,
            ..NewInsuranceProvider::default()
        })
        .await
        .unwrap();

    let defaults = repo.list_providers(Some(true)).await.unwrap();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, second.id);

    let promoted = repo
        .update_provider(
            first.id,
            ProviderChanges {
                is_default: Some(true),
                ..ProviderChanges::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(promoted.is_default);
    assert_eq!(promoted.provider_name, "First Default");

    let defaults = repo.list_providers(Some(true)).await.unwrap();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, first.id);
}

#[tokio::test]
async fn test_referenced_provider_delete_is_a_conflict() {
    let Some((repo, pool)) = repository().await else {
        return;
    };
    let seeded = seed(&pool, "Referenced Provider").await;
    repo.create_detail(details(&seeded, "2024-05-01", "2024-05-31"))
        .await
        .unwrap();

    let err = repo.delete_provider(seeded.provider_id).await.unwrap_err();
    assert!(matches!(err, InsuranceError::Conflict(_)));
}
