#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::core::sorter::*;
    use crate::error::AppError;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::tempdir;
    use tokio::fs;

    fn test_config() -> Arc<parking_lot::RwLock<Config>> {
        Arc::new(parking_lot::RwLock::new(Config::default()))
    }

    async fn write_csv(dir: &Path, content: &str) -> PathBuf {
        let csv_path = dir.join("output.csv");
        fs::write(&csv_path, content)
            .await
            .expect("Failed to write test CSV");
        csv_path
    }

    async fn write_image(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content)
            .await
            .expect("Failed to write test image");
        path
    }

    /// The worked example from the format contract: one row qualifying for
    /// TileA only
    #[tokio::test]
    async fn test_end_to_end_example() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let image = write_image(temp_dir.path(), "a.jpg", b"jpeg-bytes").await;

        let csv_path = write_csv(
            temp_dir.path(),
            &format!(
                "Photo Index, Image Path,TileA,TileB\nP1,{},25,10\n",
                image.display()
            ),
        )
        .await;

        let sorter = TileSorter::new(test_config());
        let summary = sorter.sort(&csv_path).await.expect("Sort failed");

        let images_root = temp_dir.path().join("images");
        let copied = images_root.join("TileA").join("a.jpg");
        assert!(copied.exists());
        assert_eq!(
            fs::read(&copied).await.expect("Failed to read copy"),
            b"jpeg-bytes"
        );
        assert_eq!(
            fs::read_to_string(images_root.join("TileA").join("photo_indices.txt"))
                .await
                .expect("Missing TileA log"),
            "P1\n"
        );

        assert!(!images_root.join("TileB").join("a.jpg").exists());
        assert_eq!(
            fs::read_to_string(images_root.join("TileB").join("photo_indices.txt"))
                .await
                .expect("Missing TileB log"),
            ""
        );

        assert_eq!(summary.rows, 1);
        assert_eq!(summary.total_copied(), 1);
        assert_eq!(summary.total_failed(), 0);
    }

    /// The threshold comparison is strict: exactly 20 never qualifies
    #[tokio::test]
    async fn test_threshold_boundary_is_strict() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let image = write_image(temp_dir.path(), "b.jpg", b"data").await;

        let csv_path = write_csv(
            temp_dir.path(),
            &format!(
                "Photo Index, Image Path,Edge,Above\nP7,{},20,20.0001\n",
                image.display()
            ),
        )
        .await;

        let sorter = TileSorter::new(test_config());
        let summary = sorter.sort(&csv_path).await.expect("Sort failed");

        let images_root = temp_dir.path().join("images");
        assert!(!images_root.join("Edge").join("b.jpg").exists());
        assert!(images_root.join("Above").join("b.jpg").exists());

        let edge = &summary.tiles[0];
        assert_eq!((edge.copied, edge.skipped), (0, 1));
        let above = &summary.tiles[1];
        assert_eq!((above.copied, above.skipped), (1, 0));
    }

    /// Non-numeric, empty, and missing cells leave no trace in any log
    #[tokio::test]
    async fn test_unparsable_cells_are_silently_skipped() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let image = write_image(temp_dir.path(), "c.jpg", b"data").await;

        let csv_path = write_csv(
            temp_dir.path(),
            &format!(
                "Photo Index, Image Path,T1,T2,T3\n\
                 P1,{img},N/A,,90\n\
                 P2,{img}\n",
                img = image.display()
            ),
        )
        .await;

        let sorter = TileSorter::new(test_config());
        let summary = sorter.sort(&csv_path).await.expect("Sort failed");

        let images_root = temp_dir.path().join("images");
        for tile in ["T1", "T2"] {
            assert_eq!(
                fs::read_to_string(images_root.join(tile).join("photo_indices.txt"))
                    .await
                    .expect("Missing log"),
                ""
            );
        }
        assert_eq!(
            fs::read_to_string(images_root.join("T3").join("photo_indices.txt"))
                .await
                .expect("Missing log"),
            "P1\n"
        );

        assert_eq!(summary.rows, 2);
        assert_eq!(summary.total_copied(), 1);
        assert_eq!(summary.total_failed(), 0);
    }

    /// Index logs are truncated on every run, so they describe the latest
    /// run only
    #[tokio::test]
    async fn test_rerun_truncates_index_logs() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let image = write_image(temp_dir.path(), "d.jpg", b"data").await;

        let csv_path = write_csv(
            temp_dir.path(),
            &format!("Photo Index, Image Path,T\nP9,{},55\n", image.display()),
        )
        .await;

        let sorter = TileSorter::new(test_config());
        sorter.sort(&csv_path).await.expect("First sort failed");
        sorter.sort(&csv_path).await.expect("Second sort failed");

        let log = temp_dir
            .path()
            .join("images")
            .join("T")
            .join("photo_indices.txt");
        assert_eq!(
            fs::read_to_string(&log).await.expect("Missing log"),
            "P9\n"
        );
    }

    /// A missing required column aborts before any tile folder is created
    #[tokio::test]
    async fn test_missing_column_aborts_before_tile_folders() {
        let temp_dir = tempdir().expect("Failed to create temp directory");

        // "Image Path" without the leading space is a different column
        let csv_path = write_csv(
            temp_dir.path(),
            "Photo Index,Image Path,TileA\nP1,/imgs/a.jpg,99\n",
        )
        .await;

        let sorter = TileSorter::new(test_config());
        let err = sorter.sort(&csv_path).await.expect_err("Sort should fail");

        assert!(matches!(
            err,
            AppError::ColumnNotFound { ref name } if name.as_str() == IMAGE_PATH_COLUMN
        ));
        assert!(!temp_dir.path().join("images").join("TileA").exists());
    }

    /// A missing CSV is fatal at open time
    #[tokio::test]
    async fn test_missing_csv_is_fatal() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let csv_path = temp_dir.path().join("nope.csv");

        let sorter = TileSorter::new(test_config());
        let err = sorter.sort(&csv_path).await.expect_err("Sort should fail");
        assert!(matches!(err, AppError::FileNotFound { .. }));
    }

    /// A failed copy is surfaced in the summary, leaves no log line, and
    /// does not stop the run
    #[tokio::test]
    async fn test_copy_failure_is_counted_not_fatal() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let image = write_image(temp_dir.path(), "e.jpg", b"data").await;
        let missing = temp_dir.path().join("missing.jpg");

        let csv_path = write_csv(
            temp_dir.path(),
            &format!(
                "Photo Index, Image Path,T\nP1,{},75\nP2,{},75\n",
                missing.display(),
                image.display()
            ),
        )
        .await;

        let sorter = TileSorter::new(test_config());
        let summary = sorter.sort(&csv_path).await.expect("Sort failed");

        assert_eq!(summary.total_failed(), 1);
        assert_eq!(summary.total_copied(), 1);

        // Only the second row's photo made it into the log
        let log = temp_dir
            .path()
            .join("images")
            .join("T")
            .join("photo_indices.txt");
        assert_eq!(
            fs::read_to_string(&log).await.expect("Missing log"),
            "P2\n"
        );
    }

    /// The destination is overwritten when it already exists
    #[tokio::test]
    async fn test_copy_overwrites_existing_destination() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let image = write_image(temp_dir.path(), "f.jpg", b"new-bytes").await;

        let tile_dir = temp_dir.path().join("images").join("T");
        fs::create_dir_all(&tile_dir)
            .await
            .expect("Failed to pre-create tile dir");
        fs::write(tile_dir.join("f.jpg"), b"stale")
            .await
            .expect("Failed to write stale file");

        let csv_path = write_csv(
            temp_dir.path(),
            &format!("Photo Index, Image Path,T\nP1,{},30\n", image.display()),
        )
        .await;

        let sorter = TileSorter::new(test_config());
        sorter.sort(&csv_path).await.expect("Sort failed");

        assert_eq!(
            fs::read(tile_dir.join("f.jpg")).await.expect("Missing copy"),
            b"new-bytes"
        );
    }

    /// Log line counts equal the number of qualifying cells per tile
    #[tokio::test]
    async fn test_log_lines_match_qualifying_rows() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let image = write_image(temp_dir.path(), "g.jpg", b"data").await;

        let csv_path = write_csv(
            temp_dir.path(),
            &format!(
                "Photo Index, Image Path,T1,T2\n\
                 0,{img},21,19\n\
                 1,{img},80.5,20\n\
                 2,{img},oops,100\n\
                 3,{img},20.0,35\n",
                img = image.display()
            ),
        )
        .await;

        let sorter = TileSorter::new(test_config());
        let summary = sorter.sort(&csv_path).await.expect("Sort failed");

        let images_root = temp_dir.path().join("images");
        let t1 = fs::read_to_string(images_root.join("T1").join("photo_indices.txt"))
            .await
            .expect("Missing T1 log");
        let t2 = fs::read_to_string(images_root.join("T2").join("photo_indices.txt"))
            .await
            .expect("Missing T2 log");

        assert_eq!(t1, "0\n1\n");
        assert_eq!(t2, "2\n3\n");
        assert_eq!(summary.total_copied(), 4);
    }

    /// Index logs written by the sorter load back as integer sets
    #[tokio::test]
    async fn test_load_photo_indices_round_trip() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let image = write_image(temp_dir.path(), "h.jpg", b"data").await;

        let csv_path = write_csv(
            temp_dir.path(),
            &format!(
                "Photo Index, Image Path,T\n10,{img},50\n11,{img},10\n12,{img},60\n",
                img = image.display()
            ),
        )
        .await;

        let sorter = TileSorter::new(test_config());
        sorter.sort(&csv_path).await.expect("Sort failed");

        let log = temp_dir
            .path()
            .join("images")
            .join("T")
            .join("photo_indices.txt");
        let indices = load_photo_indices(&log).await.expect("Load failed");

        assert_eq!(indices.len(), 2);
        assert!(indices.contains(&10));
        assert!(indices.contains(&12));
        assert!(!indices.contains(&11));
    }

    #[tokio::test]
    async fn test_load_photo_indices_rejects_garbage() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let log = temp_dir.path().join("photo_indices.txt");
        fs::write(&log, "1\ntwo\n3\n")
            .await
            .expect("Failed to write log");

        let err = load_photo_indices(&log)
            .await
            .expect_err("Load should fail");
        assert!(matches!(err, AppError::ParseError { .. }));
    }

    #[test]
    fn test_evaluate_cell_taxonomy() {
        assert_eq!(evaluate_cell(None, 20.0), Err(SkipReason::EmptyCell));
        assert_eq!(evaluate_cell(Some(""), 20.0), Err(SkipReason::EmptyCell));
        assert_eq!(
            evaluate_cell(Some("  "), 20.0),
            Err(SkipReason::EmptyCell)
        );
        assert_eq!(
            evaluate_cell(Some("N/A"), 20.0),
            Err(SkipReason::NotNumeric)
        );
        assert_eq!(
            evaluate_cell(Some("20"), 20.0),
            Err(SkipReason::BelowThreshold)
        );
        assert_eq!(
            evaluate_cell(Some("12.5"), 20.0),
            Err(SkipReason::BelowThreshold)
        );
        // Surrounding whitespace is tolerated, as the upstream writer's
        // consumers always did
        assert_eq!(evaluate_cell(Some(" 25 "), 20.0), Ok(25.0));
        assert_eq!(evaluate_cell(Some("20.0001"), 20.0), Ok(20.0001));
    }
}
