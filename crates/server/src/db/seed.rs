//! Catalog and reference data shipped with a fresh installation.
//!
//! Rows are identified by `code` (reference data) or `name` (items), so
//! [`seed`] can run any number of times.

use rust_decimal::Decimal;
use sqlx::PgPool;

use super::RepositoryError;

/// Delivery methods as `(code, name)`.
pub const DELIVERY_METHODS: &[(&str, &str)] = &[
    ("pickup", "Pickup"),
    ("delivery", "Delivery"),
    ("gojek", "Gojek"),
    ("citytran", "Citytran"),
    ("paxel", "Paxel"),
    ("daytrans", "Daytrans"),
    ("baraya", "Baraya"),
    ("lintas", "Lintas"),
    ("bineka", "Bineka"),
    ("jne", "JNE"),
];

/// Payment methods as `(code, name)`.
pub const PAYMENT_METHODS: &[(&str, &str)] = &[
    ("tunai", "Tunai"),
    ("kartu_kredit", "Kartu Kredit"),
    ("transfer_bank", "Transfer Bank"),
    ("qris", "QRIS"),
];

/// Order statuses as `(code, name)`.
pub const ORDER_STATUSES: &[(&str, &str)] = &[
    ("downpayment", "Downpayment"),
    ("belum_bayar", "Belum Bayar"),
    ("lunas", "Lunas"),
];

/// Catalog items as `(name, price)`.
pub const CATALOG: &[(&str, i64)] = &[
    ("Lasagna Mini", 65_000),
    ("Lasagna Small", 95_000),
    ("Lasagna Medium", 180_000),
    ("Lasagna Long", 295_000),
    ("Lasagna Xtra Medium", 395_000),
    ("Lasagna Family", 495_000),
    ("Lasagna Xtra Family", 555_000),
    ("Lasagna Party Medium", 1_350_000),
    ("Lasagna Party Large", 2_750_000),
    ("Macaroni Mini", 50_000),
    ("Macaroni Small", 85_000),
    ("Macaroni Oval", 110_000),
    ("Macaroni Medium", 165_000),
    ("Macaroni Long", 250_000),
    ("Macaroni Xtra Medium", 335_000),
    ("Macaroni Family", 380_000),
    ("Macaroni Xtra Family", 445_000),
    ("Macaroni Party Medium", 1_100_000),
    ("Macaroni Party Large", 2_200_000),
    ("Marmer Cake 1 Loyang Bulat", 335_000),
    ("Marmer Cake 1 Loyang Dipotong", 335_000),
    ("Marmer Cake 1 Slice", 22_000),
    ("Marmer Cake 3 Slice", 63_000),
    ("Marmer Cake 6 Slice", 125_000),
    ("Marmer Cake 9 Slice", 185_000),
    ("Marmer Cake 12 Slice", 245_000),
    ("Nastar Bulat", 185_000),
    ("Nastar Kotak", 135_000),
    ("Kue Keju Bulat", 195_000),
    ("Kue Keju Kotak", 145_000),
    ("Lidah Kucing Bulat", 150_000),
    ("Lidah Kucing Kotak", 120_000),
    ("Sagu Keju Bulat", 150_000),
    ("Sagu Keju Kotak", 120_000),
    ("Almond Keju Bulat", 185_000),
    ("Almond Keju Kotak", 135_000),
    ("Cheese Stick Kotak", 160_000),
    ("Bolu Peuyeum 1 Slice", 11_000),
    ("Bolu Peuyeum 5 Slice", 50_000),
    ("Bolu Peuyeum 12 Slice", 110_000),
    ("Bolu Peuyeum 1 Loyang Utuh", 140_000),
    ("Roti Baso", 15_000),
    ("Roti Keju", 15_000),
    ("Roti Coklat", 15_000),
    ("Pudding 1 Cup", 30_000),
    ("Pudding 4 Cup", 115_000),
    ("Pudding 6 Cup", 172_500),
    ("Box Hampers Box K3", 75_000),
    ("Box Hampers Box K4", 95_000),
    ("Box Hampers Box B3", 85_000),
    ("Box Hampers Box B4", 95_000),
    ("Tas Kain MC", 15_000),
    ("Tas Kain K3", 15_000),
    ("Tas Kain K4", 15_000),
    ("Tas Kain B3", 15_000),
    ("Tas Kain B4", 15_000),
    ("Hampers Marmer Cake", 350_000),
];

/// Number of rows inserted by one [`seed`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub delivery_methods: u64,
    pub payment_methods: u64,
    pub order_statuses: u64,
    pub items: u64,
}

/// Insert any missing reference data and catalog items in one transaction.
///
/// Existing rows are left untouched, including item prices.
///
/// # Errors
///
/// Returns `RepositoryError` if any insert fails.
pub async fn seed(pool: &PgPool) -> Result<SeedReport, RepositoryError> {
    let mut tx = pool.begin().await?;
    let mut report = SeedReport::default();

    for &(code, name) in DELIVERY_METHODS {
        report.delivery_methods += sqlx::query(
            "INSERT INTO delivery_methods (code, name) VALUES ($1, $2) ON CONFLICT (code) DO NOTHING",
        )
        .bind(code)
        .bind(name)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    for &(code, name) in PAYMENT_METHODS {
        report.payment_methods += sqlx::query(
            "INSERT INTO payment_methods (code, name) VALUES ($1, $2) ON CONFLICT (code) DO NOTHING",
        )
        .bind(code)
        .bind(name)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    for &(code, name) in ORDER_STATUSES {
        report.order_statuses += sqlx::query(
            "INSERT INTO order_statuses (code, name) VALUES ($1, $2) ON CONFLICT (code) DO NOTHING",
        )
        .bind(code)
        .bind(name)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    for &(name, price) in CATALOG {
        report.items += sqlx::query(
            "INSERT INTO items (name, price) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(Decimal::from(price))
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    tx.commit().await?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_codes_are_unique() {
        for table in [DELIVERY_METHODS, PAYMENT_METHODS, ORDER_STATUSES] {
            let codes: HashSet<_> = table.iter().map(|(code, _)| code).collect();
            assert_eq!(codes.len(), table.len());
        }
    }

    #[test]
    fn test_catalog_names_unique_and_prices_positive() {
        let names: HashSet<_> = CATALOG.iter().map(|(name, _)| name).collect();
        assert_eq!(names.len(), CATALOG.len());
        assert!(CATALOG.iter().all(|&(_, price)| price > 0));
    }

    #[test]
    fn test_first_catalog_item_is_lasagna_mini() {
        assert_eq!(CATALOG.first(), Some(&("Lasagna Mini", 65_000)));
    }
}
