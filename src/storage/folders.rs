//! Sequential upload folder allocation (`upload_id_001/`, `upload_id_002/`, ...)

use chrono::Utc;
use regex::Regex;

use super::ObjectStore;

/// Next free upload folder under `prefix`.
///
/// Picks one past the highest numbered `upload_id_NNN/` folder. If the store
/// cannot be listed, falls back to a timestamped folder name.
pub async fn allocate_upload_folder(store: &dyn ObjectStore, prefix: &str) -> String {
    match store.list_folders(prefix).await {
        Ok(folders) => {
            let next_id = highest_upload_id(&folders) + 1;
            format!("{}upload_id_{:03}/", prefix, next_id)
        }
        Err(e) => {
            tracing::warn!(prefix = %prefix, error = %e, "Failed to list upload folders, using timestamp");
            format!("{}upload_id_{}/", prefix, Utc::now().format("%Y%m%d-%H%M%S"))
        }
    }
}

fn highest_upload_id(folders: &[String]) -> u64 {
    let pattern = Regex::new(r"^upload_id_(\d{3,})/$").expect("upload id pattern is valid");
    folders
        .iter()
        .filter_map(|f| pattern.captures(f))
        .filter_map(|c| c[1].parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}
