use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::{PoisonError, RwLock};

use crate::utils::login_id_cache::normalize;

const FILTER_CAPACITY: usize = 10_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static LOGIN_ID_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// False positives possible, false negatives not.
pub fn might_exist(login_id: &str) -> bool {
    LOGIN_ID_FILTER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(&normalize(login_id))
}

pub fn insert(login_id: &str) {
    LOGIN_ID_FILTER
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .add(&normalize(login_id));
}

pub async fn warmup_login_id_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT login_id FROM employees").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (login_id,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(normalize(&login_id));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    log::info!("Login id filter warmup complete: {} employees", total);
    Ok(())
}

fn insert_batch(login_ids: &[String]) {
    let mut filter = LOGIN_ID_FILTER
        .write()
        .unwrap_or_else(PoisonError::into_inner);

    for login_id in login_ids {
        filter.add(login_id);
    }
}
