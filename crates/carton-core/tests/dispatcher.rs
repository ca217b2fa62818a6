//! End-to-end dispatch scenarios against an in-memory host library.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::Result;
use carton_core::{
    Caller, DispatchError, Dispatcher, Download, EntryKind, Journal, Library, LibraryFile,
    PurgeMode, Settings, SettingsPatch, SettingsStore,
};
use tempfile::TempDir;
use zip::ZipArchive;

const TEMP_BASE_URL: &str = "https://library.test/temp";

#[derive(Default)]
struct FixtureLibrary {
    files: HashMap<u64, LibraryFile>,
    denied_ids: HashSet<u64>,
    download_denied: bool,
}

impl FixtureLibrary {
    fn stage(&mut self, dir: &Path, id: u64, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = dir.join(format!("{id}-{name}"));
        fs::write(&path, contents)?;
        self.files.insert(
            id,
            LibraryFile {
                path: path.clone(),
                url: format!("https://library.test/files/{id}/{name}"),
                display_name: name.to_string(),
            },
        );
        Ok(path)
    }
}

impl Library for FixtureLibrary {
    fn can_download(&self, _caller: &Caller) -> bool {
        !self.download_denied
    }

    fn can_access(&self, _caller: &Caller, id: u64) -> bool {
        !self.denied_ids.contains(&id)
    }

    fn lookup(&self, id: u64) -> Option<LibraryFile> {
        self.files.get(&id).cloned()
    }
}

struct Harness {
    _temp: TempDir,
    sources: PathBuf,
    temp_root: PathBuf,
    journal: Journal,
    settings: SettingsStore,
}

impl Harness {
    fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        let sources = temp.path().join("library");
        fs::create_dir_all(&sources)?;
        let temp_root = temp.path().join("temp");
        Ok(Self {
            sources,
            temp_root,
            journal: Journal::with_capacity(100),
            settings: SettingsStore::in_memory(Settings::default()),
            _temp: temp,
        })
    }

    fn dispatcher(&self, library: FixtureLibrary) -> Result<Dispatcher> {
        Ok(Dispatcher::new(
            Arc::new(library),
            self.settings.clone(),
            self.journal.clone(),
            &self.temp_root,
            TEMP_BASE_URL,
        )?)
    }

    fn archive_entries(&self, filename: &str) -> Result<Vec<String>> {
        let archive = ZipArchive::new(File::open(self.temp_root.join(filename))?)?;
        Ok(archive.file_names().map(str::to_string).collect())
    }

    fn temp_artifacts(&self) -> Result<usize> {
        Ok(fs::read_dir(&self.temp_root)?.count())
    }
}

fn caller() -> Caller {
    Caller {
        id: 3,
        login: "alice".to_string(),
        source_ip: Some("203.0.113.9".to_string()),
    }
}

fn raw(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

#[test]
fn single_resolved_id_serves_the_file_directly() -> Result<()> {
    let harness = Harness::new()?;
    let mut library = FixtureLibrary::default();
    library.stage(&harness.sources, 5, "report.pdf", b"contents")?;
    let dispatcher = harness.dispatcher(library)?;

    let download = dispatcher.dispatch(&caller(), &raw(&["5"]))?;
    assert_eq!(
        download,
        Download::Single {
            url: "https://library.test/files/5/report.pdf".to_string(),
            filename: "report.pdf".to_string(),
        }
    );
    assert_eq!(harness.temp_artifacts()?, 0, "no artifact for single files");
    Ok(())
}

#[test]
fn duplicate_ids_collapse_and_pack_into_one_archive() -> Result<()> {
    let harness = Harness::new()?;
    let mut library = FixtureLibrary::default();
    library.stage(&harness.sources, 5, "photo.jpg", b"five")?;
    library.stage(&harness.sources, 7, "photo.jpg", b"seven")?;
    let dispatcher = harness.dispatcher(library)?;

    let download = dispatcher.dispatch(&caller(), &raw(&["5", "5", "7"]))?;
    let Download::Archive {
        url,
        filename,
        file_count,
    } = download
    else {
        panic!("expected an archive download");
    };
    assert_eq!(file_count, 2);
    assert_eq!(url, format!("{TEMP_BASE_URL}/{filename}"));

    let mut entries = harness.archive_entries(&filename)?;
    entries.sort();
    assert_eq!(entries, vec!["photo.jpg", "photo_1.jpg"]);
    Ok(())
}

#[test]
fn archive_names_follow_the_configured_pattern() -> Result<()> {
    let harness = Harness::new()?;
    harness.settings.update(&SettingsPatch {
        zip_name_pattern: Some("{user}-{timestamp}".to_string()),
        ..SettingsPatch::default()
    })?;
    let mut library = FixtureLibrary::default();
    library.stage(&harness.sources, 1, "a.bin", b"a")?;
    library.stage(&harness.sources, 2, "b.bin", b"b")?;
    let dispatcher = harness.dispatcher(library)?;

    let download = dispatcher.dispatch(&caller(), &raw(&["1", "2"]))?;
    let Download::Archive { filename, .. } = download else {
        panic!("expected an archive download");
    };
    assert!(
        filename.starts_with("alice-") && filename.ends_with(".zip"),
        "unexpected archive name {filename}"
    );
    Ok(())
}

#[test]
fn first_candidate_over_budget_fails_with_empty_result() -> Result<()> {
    let harness = Harness::new()?;
    let mut library = FixtureLibrary::default();
    // Budget floor is 1 MB; the first selected file alone exceeds it, and
    // the hard cutoff means the small second file is never considered.
    library.stage(&harness.sources, 3, "huge.iso", &vec![0u8; 2 * 1024 * 1024])?;
    library.stage(&harness.sources, 9, "tiny.txt", b"t")?;
    harness.settings.update(&SettingsPatch {
        max_download_size_mb: Some(1),
        ..SettingsPatch::default()
    })?;
    let dispatcher = harness.dispatcher(library)?;

    let result = dispatcher.dispatch(&caller(), &raw(&["3", "9"]));
    assert!(matches!(result, Err(DispatchError::EmptyResult)));
    assert_eq!(harness.temp_artifacts()?, 0, "empty archive must be removed");
    Ok(())
}

#[test]
fn denied_caller_is_unauthorized() -> Result<()> {
    let harness = Harness::new()?;
    let library = FixtureLibrary {
        download_denied: true,
        ..FixtureLibrary::default()
    };
    let dispatcher = harness.dispatcher(library)?;

    let result = dispatcher.dispatch(&caller(), &raw(&["5"]));
    assert!(matches!(result, Err(DispatchError::Unauthorized)));
    Ok(())
}

#[test]
fn garbage_ids_are_invalid_input() -> Result<()> {
    let harness = Harness::new()?;
    let dispatcher = harness.dispatcher(FixtureLibrary::default())?;

    let result = dispatcher.dispatch(&caller(), &raw(&["abc", "0", "-4"]));
    assert!(matches!(result, Err(DispatchError::InvalidInput)));
    Ok(())
}

#[test]
fn valid_but_unreachable_ids_are_not_accessible() -> Result<()> {
    let harness = Harness::new()?;
    let mut library = FixtureLibrary::default();
    let staged = library.stage(&harness.sources, 5, "gone.txt", b"soon gone")?;
    fs::remove_file(staged)?;
    library.stage(&harness.sources, 8, "secret.txt", b"classified")?;
    library.denied_ids.insert(8);
    let dispatcher = harness.dispatcher(library)?;

    let result = dispatcher.dispatch(&caller(), &raw(&["5", "8", "99"]));
    assert!(matches!(result, Err(DispatchError::NotAccessible)));
    Ok(())
}

#[test]
fn journal_records_downloads_when_logging_is_enabled() -> Result<()> {
    let harness = Harness::new()?;
    harness.settings.update(&SettingsPatch {
        logging_enabled: Some(true),
        ..SettingsPatch::default()
    })?;
    let mut library = FixtureLibrary::default();
    library.stage(&harness.sources, 5, "one.txt", b"one")?;
    library.stage(&harness.sources, 7, "two.txt", b"two")?;
    let dispatcher = harness.dispatcher(library)?;

    dispatcher.dispatch(&caller(), &raw(&["5"]))?;
    dispatcher.dispatch(&caller(), &raw(&["5", "7"]))?;

    assert_eq!(dispatcher.journal_len(), 2);
    let recent = dispatcher.journal_recent(10);
    assert_eq!(recent[0].kind, EntryKind::Zip);
    assert_eq!(recent[0].file_ids, vec![5, 7]);
    assert_eq!(recent[1].kind, EntryKind::Single);
    assert_eq!(recent[1].user, "alice");
    assert_eq!(recent[1].source_ip, "203.0.113.9");
    Ok(())
}

#[test]
fn journal_stays_silent_when_logging_is_disabled() -> Result<()> {
    let harness = Harness::new()?;
    let mut library = FixtureLibrary::default();
    library.stage(&harness.sources, 5, "one.txt", b"one")?;
    let dispatcher = harness.dispatcher(library)?;

    dispatcher.dispatch(&caller(), &raw(&["5"]))?;
    assert_eq!(dispatcher.journal_len(), 0);
    Ok(())
}

#[test]
fn purge_modes_apply_their_retention_policies() -> Result<()> {
    let harness = Harness::new()?;
    harness.settings.update(&SettingsPatch {
        logging_enabled: Some(true),
        ..SettingsPatch::default()
    })?;
    let dispatcher = harness.dispatcher(FixtureLibrary::default())?;

    // Stale archive, fresh archive, and a stray non-archive file.
    let stale = harness.temp_root.join("stale.zip");
    fs::write(&stale, b"old")?;
    let handle = File::options().append(true).open(&stale)?;
    handle.set_modified(SystemTime::now() - Duration::from_secs(25 * 3600))?;
    fs::write(harness.temp_root.join("fresh.zip"), b"new")?;
    fs::write(harness.temp_root.join("stray.txt"), b"stray")?;

    assert_eq!(dispatcher.purge(PurgeMode::Scheduled), 1);
    assert!(!stale.exists());
    assert!(harness.temp_root.join("fresh.zip").exists());

    assert_eq!(dispatcher.purge(PurgeMode::Manual), 1);
    assert!(harness.temp_root.join("stray.txt").exists());

    assert_eq!(dispatcher.purge(PurgeMode::Opportunistic), 1);
    assert_eq!(harness.temp_artifacts()?, 0);

    // Scheduled and manual purges are journaled; the opportunistic
    // view-open purge is not.
    let cleanups = dispatcher
        .journal_recent(10)
        .iter()
        .filter(|entry| entry.kind == EntryKind::Cleanup)
        .count();
    assert_eq!(cleanups, 2);
    Ok(())
}

#[test]
fn purging_an_empty_area_is_idempotent() -> Result<()> {
    let harness = Harness::new()?;
    let dispatcher = harness.dispatcher(FixtureLibrary::default())?;
    assert_eq!(dispatcher.purge(PurgeMode::Opportunistic), 0);
    assert_eq!(dispatcher.purge(PurgeMode::Opportunistic), 0);
    assert_eq!(dispatcher.purge(PurgeMode::Manual), 0);
    Ok(())
}

#[test]
fn temp_usage_reports_archive_count_and_bytes() -> Result<()> {
    let harness = Harness::new()?;
    let dispatcher = harness.dispatcher(FixtureLibrary::default())?;
    fs::write(harness.temp_root.join("a.zip"), vec![0u8; 8])?;
    fs::write(harness.temp_root.join("b.zip"), vec![0u8; 4])?;
    assert_eq!(dispatcher.temp_usage(), (2, 12));
    Ok(())
}

#[tokio::test]
async fn spawned_sweeper_removes_stale_archives() -> Result<()> {
    let harness = Harness::new()?;
    let dispatcher = harness.dispatcher(FixtureLibrary::default())?;

    let stale = harness.temp_root.join("stale.zip");
    fs::write(&stale, b"old")?;
    let handle = File::options().append(true).open(&stale)?;
    handle.set_modified(SystemTime::now() - Duration::from_secs(48 * 3600))?;

    let sweeper = dispatcher.spawn_sweeper(Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(500)).await;
    sweeper.abort();

    assert!(!stale.exists(), "scheduled sweep should remove stale archives");
    Ok(())
}
