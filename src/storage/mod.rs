//! Storage inventory: basenames of the objects mirrored under an item's
//! category prefix.

pub mod error;
pub mod s3;

use async_trait::async_trait;

pub use error::StorageError;
pub use s3::S3Lister;

use crate::types::Category;

/// Lists every object key under a prefix, across all result pages.
#[async_trait]
pub trait ObjectLister: Send + Sync {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Sorted basenames (extension kept) of the objects in `category` of `item_id`.
///
/// Folder-marker keys ending in `/` have no basename and are left out.
pub async fn fetch_storage_filenames(
    lister: &dyn ObjectLister,
    item_id: &str,
    category: Category,
) -> Result<Vec<String>, StorageError> {
    let prefix = category.prefix_for(item_id);
    let keys = lister.list_keys(&prefix).await?;
    let mut names: Vec<String> = keys
        .iter()
        .filter_map(|key| key.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    names.sort();
    tracing::debug!(prefix = %prefix, count = names.len(), "Listed storage objects");
    Ok(names)
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryLister;
    use super::*;

    #[tokio::test]
    async fn test_basenames_sorted() {
        let lister = MemoryLister::with_keys([
            "item1/downloads/p2.jpg",
            "item1/downloads/p1.jpg",
            "item1/downloads/p10.jpg",
            "item1/ocr/p1.txt",
            "item2/downloads/p1.jpg",
        ]);
        let names = fetch_storage_filenames(&lister, "item1", Category::Downloads)
            .await
            .unwrap();
        assert_eq!(names, ["p1.jpg", "p10.jpg", "p2.jpg"]);
        assert_eq!(*lister.prefixes.lock().unwrap(), ["item1/downloads"]);
    }

    #[tokio::test]
    async fn test_prefix_without_slash_matches_sibling_categories() {
        // "item1/ocr" also matches an "item1/ocr_raw" folder, as the raw prefix listing does
        let lister = MemoryLister::with_keys(["item1/ocr/p1.txt", "item1/ocr_raw/p1.hocr"]);
        let names = fetch_storage_filenames(&lister, "item1", Category::Ocr)
            .await
            .unwrap();
        assert_eq!(names, ["p1.hocr", "p1.txt"]);
    }

    #[tokio::test]
    async fn test_empty_category() {
        let lister = MemoryLister::default();
        let names = fetch_storage_filenames(&lister, "item1", Category::Thumbnails)
            .await
            .unwrap();
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn test_folder_markers_are_skipped() {
        let lister = MemoryLister::with_keys([
            "item1/thumbnails/",
            "item1/thumbnails/p1.png",
            "item1/thumbnails/nested/",
        ]);
        let names = fetch_storage_filenames(&lister, "item1", Category::Thumbnails)
            .await
            .unwrap();
        assert_eq!(names, ["p1.png"]);
    }

    #[tokio::test]
    async fn test_listing_error_propagates() {
        let lister = MemoryLister::failing();
        let err = fetch_storage_filenames(&lister, "item1", Category::Downloads)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("item1/downloads"));
    }
}
