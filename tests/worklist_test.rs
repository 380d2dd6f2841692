//! Work List Integration Tests
//!
//! ## Test Coverage
//!
//! - Directory enumeration order and filtering
//! - Saved lists read back identically
//! - Enumeration errors for missing inputs

#[cfg(test)]
mod tests {
    use bulk_uploadr::destination::Destination;
    use bulk_uploadr::worklist::{EnumerationError, ListSource, WorkList};
    use std::fs;

    #[test]
    fn test_directory_enumeration_is_sorted_and_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/nested")).unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("d.bin"), b"d").unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::write(dir.path().join("b/c.txt"), b"c").unwrap();
        fs::write(dir.path().join("b/nested/z.txt"), b"z").unwrap();

        let work = WorkList::from_directory(dir.path()).unwrap();

        assert_eq!(
            work.paths(),
            vec!["a.txt", "b/c.txt", "b/nested/z.txt", "d.bin"]
        );
        assert_eq!(work.root(), dir.path());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_file_is_included() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("real.txt"), b"real").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.txt"))
            .unwrap();
        std::os::unix::fs::symlink(dir.path().join("nowhere"), dir.path().join("dangling"))
            .unwrap();

        let work = WorkList::from_directory(dir.path()).unwrap();
        assert_eq!(work.paths(), vec!["link.txt", "real.txt"]);
    }

    #[test]
    fn test_missing_directory_is_walk_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = WorkList::from_directory(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, EnumerationError::Walk { .. }));
    }

    #[test]
    fn test_regular_file_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("single.txt");
        fs::write(&file, b"x").unwrap();

        let err = WorkList::from_directory(&file).unwrap_err();
        assert!(matches!(err, EnumerationError::NotADirectory { .. }));
        assert!(err.to_string().contains("single.txt"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_unusual_names_open_original_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(r"weird\name.txt"), b"w").unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"caf\xe9.txt")), b"c").unwrap();

        let dest = Destination::parse("s3://bucket", "s3").unwrap();
        let work = WorkList::from_directory(dir.path()).unwrap();
        let items: Vec<_> = work.items(&dest).collect();

        assert_eq!(items.len(), 2);
        for item in &items {
            assert!(item.local.is_file(), "{} should exist", item.local.display());
        }
        assert!(items.iter().any(|i| i.key == "weird/name.txt"));
        assert!(items.iter().any(|i| i.key == "caf\u{FFFD}.txt"));
    }

    #[test]
    fn test_missing_list_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = ListSource::File(dir.path().join("absent.txt"));
        let err = WorkList::from_list_source(&source).unwrap_err();
        assert!(matches!(err, EnumerationError::OpenList { .. }));
    }

    #[test]
    fn test_save_then_load_list() {
        let dir = tempfile::tempdir().unwrap();
        let work = WorkList::new("", vec!["a.txt".into(), "b/c.txt".into()]);
        let list_path = dir.path().join("files.txt");

        work.save(&list_path).unwrap();
        assert_eq!(fs::read_to_string(&list_path).unwrap(), "a.txt\nb/c.txt\n");

        let loaded = WorkList::from_list_source(&ListSource::File(list_path)).unwrap();
        assert_eq!(loaded.paths(), work.paths());

        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_items_carry_destination_keys() {
        let dest = Destination::parse("s3://bucket/backup/", "s3").unwrap();
        let work = WorkList::new("/srv", vec!["x.txt".into(), "y/z.txt".into()]);

        let keys: Vec<String> = work.items(&dest).map(|item| item.key).collect();
        assert_eq!(keys, vec!["backup/x.txt", "backup/y/z.txt"]);
    }
}
