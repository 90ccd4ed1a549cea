use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::plugin::archive::ArchiveContents;
use crate::plugin::descriptor::PackageDescriptor;
use crate::plugin::error::{InstallError, InstallResult};
use crate::plugin::fetch::Fetcher;
use crate::plugin::hooks::HostHooks;
use crate::plugin::planner::{self, EntryClassifier, ExtractionPlan, PlannedEntry};
use crate::plugin::uninstaller::prune_empty_ancestors;

const WRITE_WORKERS: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub files_written: usize,
    pub directories_created: usize,
    pub renamed_to: Option<String>,
    pub unmatched_patterns: Vec<String>,
}

impl InstallReport {
    pub fn summary(&self) -> String {
        let mut summary = format!("{} files", self.files_written);
        if self.directories_created > 0 {
            summary.push_str(&format!(", {} directories", self.directories_created));
        }
        if let Some(name) = &self.renamed_to {
            summary.push_str(&format!(" (as {name})"));
        }
        if !self.unmatched_patterns.is_empty() {
            summary.push_str(&format!(
                ", nothing matched {}",
                self.unmatched_patterns.join(", ")
            ));
        }
        summary
    }
}

/// Fetches, plans and materializes packages under one installation root.
pub struct Installer {
    root: PathBuf,
    fetcher: Fetcher,
    classifier: Box<dyn EntryClassifier + Send + Sync>,
    hooks: HostHooks,
}

impl Installer {
    pub fn new(
        root: impl Into<PathBuf>,
        fetcher: Fetcher,
        classifier: Box<dyn EntryClassifier + Send + Sync>,
        hooks: HostHooks,
    ) -> Self {
        Self {
            root: root.into(),
            fetcher,
            classifier,
            hooks,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn hooks(&self) -> &HostHooks {
        &self.hooks
    }

    /// Download `descriptor`'s archive and write the selected entries under
    /// the root, then run the host's rebuild and reload hooks.
    ///
    /// Files already written stay in place if a later step fails.
    pub fn install(&self, descriptor: &PackageDescriptor) -> InstallResult<InstallReport> {
        tracing::info!("installing {} from {}", descriptor.name, descriptor.archive_url);
        std::fs::create_dir_all(&self.root)
            .map_err(|err| InstallError::fs("create", &self.root, err))?;

        let bytes = self.fetcher.fetch_bytes(&descriptor.archive_url)?;

        // The archive is staged next to the packages and removed afterwards.
        let mut transient = tempfile::Builder::new()
            .prefix(&descriptor.transient_archive_prefix())
            .suffix(".zip")
            .tempfile_in(&self.root)
            .map_err(|err| InstallError::fs("create", &self.root, err))?;
        let staged = transient.path().to_path_buf();
        transient
            .write_all(&bytes)
            .map_err(|err| InstallError::fs("write", &staged, err))?;
        drop(bytes);

        let mut bytes = Vec::new();
        transient
            .seek(SeekFrom::Start(0))
            .and_then(|_| transient.read_to_end(&mut bytes))
            .map_err(|err| InstallError::fs("read", &staged, err))?;

        let contents = ArchiveContents::decode(&bytes)?;
        let plan = planner::plan(&contents, descriptor, self.classifier.as_ref())?;
        tracing::info!(
            "{}: root {:?}, prefix {:?}, {} of {} entries selected ({} files)",
            descriptor.name,
            plan.root_dir_name(),
            plan.common_prefix_path(),
            plan.entries.len(),
            contents.len(),
            plan.file_count()
        );
        for pattern in &plan.unmatched_patterns {
            tracing::warn!("{}: pattern {pattern:?} matched nothing", descriptor.name);
        }

        let mut report = self.materialize(&contents, &plan)?;
        report.unmatched_patterns = plan.unmatched_patterns.clone();
        report.renamed_to = match plan.renamed_to.clone() {
            Some(name) => Some(name),
            None => self.rename_single_file(descriptor, &plan)?,
        };

        if let Err(err) = transient.close() {
            tracing::warn!("failed to remove {}: {err}", staged.display());
        }

        self.hooks.rebuild_and_reload()?;
        tracing::info!("installed {}: {}", descriptor.name, report.summary());
        Ok(report)
    }

    fn materialize(
        &self,
        contents: &ArchiveContents,
        plan: &ExtractionPlan,
    ) -> InstallResult<InstallReport> {
        let mut report = InstallReport::default();

        for dir in plan.directories() {
            let path = self.root.join(&dir.destination);
            std::fs::create_dir_all(&path).map_err(|err| InstallError::fs("create", &path, err))?;
            report.directories_created += 1;
        }

        let files: Vec<&PlannedEntry> = plan.files().collect();
        if files.is_empty() {
            return Ok(report);
        }

        let chunk_size = files.len().div_ceil(WRITE_WORKERS);
        std::thread::scope(|scope| {
            let workers: Vec<_> = files
                .chunks(chunk_size)
                .map(|chunk| scope.spawn(move || self.write_files(contents, chunk)))
                .collect();

            for worker in workers {
                worker.join().map_err(|_| {
                    InstallError::fs(
                        "write",
                        &self.root,
                        std::io::Error::other("file writer panicked"),
                    )
                })??;
            }
            Ok::<_, InstallError>(())
        })?;

        report.files_written = files.len();
        Ok(report)
    }

    fn write_files(&self, contents: &ArchiveContents, chunk: &[&PlannedEntry]) -> InstallResult<()> {
        for entry in chunk {
            let path = self.root.join(&entry.destination);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|err| InstallError::fs("create", parent, err))?;
            }
            let data = contents
                .get(&entry.source)
                .map(|archived| archived.data.as_slice())
                .unwrap_or_default();
            std::fs::write(&path, data).map_err(|err| InstallError::fs("write", &path, err))?;
        }
        Ok(())
    }

    /// A single-file target whose one pattern names a file that landed
    /// somewhere below the root gets moved to `root/destination_name`.
    fn rename_single_file(
        &self,
        descriptor: &PackageDescriptor,
        plan: &ExtractionPlan,
    ) -> InstallResult<Option<String>> {
        if !descriptor.is_single_file_target() {
            return Ok(None);
        }
        let Some([pattern]) = descriptor.patterns() else {
            return Ok(None);
        };
        let pattern = pattern.trim().trim_matches('/');
        let has_extension = pattern
            .rsplit('/')
            .next()
            .is_some_and(|name| name.contains('.'));
        if !has_extension {
            return Ok(None);
        }

        let Some(found) = plan.files().find(|entry| {
            entry.destination == pattern || entry.destination.ends_with(&format!("/{pattern}"))
        }) else {
            return Ok(None);
        };
        if found.destination == descriptor.destination_name {
            return Ok(None);
        }

        let from = self.root.join(&found.destination);
        let to = self.root.join(&descriptor.destination_name);
        std::fs::rename(&from, &to).map_err(|err| InstallError::fs("rename", &from, err))?;
        if let Some(parent) = from.parent() {
            prune_empty_ancestors(&self.root, parent)?;
        }

        tracing::debug!("renamed {} to {}", found.destination, descriptor.destination_name);
        Ok(Some(descriptor.destination_name.clone()))
    }
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("root", &self.root)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::error::ErrorKind;
    use crate::plugin::hooks::tests::RecordingRunner;
    use crate::plugin::planner::ArchiveMarkers;
    use crate::plugin::test_support::{tree, zip_file_url};
    use std::sync::Arc;
    use std::time::Duration;

    struct Fixture {
        _dir: tempfile::TempDir,
        archives: PathBuf,
        root: PathBuf,
        runner: Arc<RecordingRunner>,
        installer: Installer,
    }

    fn fixture_with(runner: RecordingRunner) -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let archives = dir.path().join("archives");
        let root = dir.path().join("plugins");
        std::fs::create_dir_all(&archives).expect("mkdir archives");

        let runner = Arc::new(runner);
        let hooks = HostHooks::new("pnpm build", "pnpm inject", dir.path(), runner.clone());
        let fetcher = Fetcher::new(Duration::from_secs(5), "pluginrepo-test").expect("client");
        let installer = Installer::new(
            &root,
            fetcher,
            Box::new(ArchiveMarkers::<planner::DotHeuristic>::default()),
            hooks,
        );

        Fixture {
            _dir: dir,
            archives,
            root,
            runner,
            installer,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingRunner::default())
    }

    #[test]
    fn installs_selected_directory_into_wrapping_directory() {
        let fx = fixture();
        let url = zip_file_url(
            &fx.archives,
            "myplugin.zip",
            &[
                ("MyPlugin-main/", None),
                ("MyPlugin-main/src/", None),
                ("MyPlugin-main/src/index.ts", Some("export {}")),
                ("MyPlugin-main/src/style.css", Some("a {}")),
                ("MyPlugin-main/README.md", Some("# readme")),
            ],
        );
        let descriptor =
            PackageDescriptor::new("My Plugin", "myPlugin", "myPlugin", url).with_patterns(["src"]);

        let report = fx.installer.install(&descriptor).expect("installs");
        assert_eq!(report.files_written, 2);
        assert_eq!(
            tree(&fx.root),
            vec!["myPlugin/", "myPlugin/index.ts", "myPlugin/style.css"]
        );
        assert_eq!(
            std::fs::read_to_string(fx.root.join("myPlugin/index.ts")).expect("read"),
            "export {}"
        );
        assert_eq!(fx.runner.calls.lock().expect("calls").len(), 2);
    }

    #[test]
    fn rooted_archive_never_leaks_its_root_directory() {
        let fx = fixture();
        let url = zip_file_url(
            &fx.archives,
            "rooted.zip",
            &[
                ("Repo-main/", None),
                ("Repo-main/index.ts", Some("x")),
                ("Repo-main/lib/util.ts", Some("y")),
            ],
        );
        let descriptor = PackageDescriptor::new("Repo", "repo", "repo", url);

        fx.installer.install(&descriptor).expect("installs");
        let paths = tree(&fx.root);
        assert!(paths.iter().all(|path| !path.contains("Repo-main")), "{paths:?}");
        assert_eq!(paths, vec!["repo/", "repo/index.ts", "repo/lib/", "repo/lib/util.ts"]);
    }

    #[test]
    fn reinstalling_overwrites_in_place() {
        let fx = fixture();
        let url = zip_file_url(
            &fx.archives,
            "sekai.zip",
            &[
                ("sekai-main/Components/Picker.tsx", Some("v1")),
                ("sekai-main/index.tsx", Some("v1")),
                ("sekai-main/package.json", Some("{}")),
            ],
        );
        let descriptor = PackageDescriptor::new("Sekai", "sekai", "sekai", url)
            .with_patterns(["Components", "index.tsx"]);

        fx.installer.install(&descriptor).expect("first install");
        let first = tree(&fx.root);
        fx.installer.install(&descriptor).expect("second install");
        assert_eq!(tree(&fx.root), first);
    }

    #[test]
    fn single_file_target_lands_at_the_root_under_its_new_name() {
        let fx = fixture();
        let url = zip_file_url(
            &fx.archives,
            "neko.zip",
            &[
                ("vc-main/", None),
                ("vc-main/plugins/", None),
                ("vc-main/plugins/neko/index.ts", Some("meow")),
                ("vc-main/README.md", Some("# readme")),
            ],
        );
        let descriptor = PackageDescriptor::new("Neko", "neko.ts", "neko.ts", url)
            .with_patterns(["plugins/neko/index.ts"]);

        let report = fx.installer.install(&descriptor).expect("installs");
        assert_eq!(report.renamed_to.as_deref(), Some("neko.ts"));
        assert_eq!(tree(&fx.root), vec!["neko.ts"]);
    }

    #[test]
    fn ambiguous_single_file_pattern_renames_the_first_match() {
        let fx = fixture();
        let url = zip_file_url(
            &fx.archives,
            "dupes.zip",
            &[
                ("r/a/husk.tsx", Some("first")),
                ("r/b/husk.tsx", Some("second")),
            ],
        );
        let descriptor =
            PackageDescriptor::new("Husk", "husk.tsx", "husk.tsx", url).with_patterns(["husk.tsx"]);

        let report = fx.installer.install(&descriptor).expect("installs");
        assert_eq!(report.renamed_to.as_deref(), Some("husk.tsx"));
        assert_eq!(tree(&fx.root), vec!["b/", "b/husk.tsx", "husk.tsx"]);
        assert_eq!(
            std::fs::read_to_string(fx.root.join("husk.tsx")).expect("read"),
            "first"
        );
    }

    #[test]
    fn corrupt_archive_fails_without_leaving_the_staged_file() {
        let fx = fixture();
        let path = fx.archives.join("broken.zip");
        std::fs::write(&path, b"definitely not a zip").expect("write");
        let url = format!("file://{}", path.display());
        let descriptor = PackageDescriptor::new("Broken", "broken", "broken", url);

        let err = fx.installer.install(&descriptor).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Archive);
        assert!(tree(&fx.root).is_empty());
        assert!(fx.runner.calls.lock().expect("calls").is_empty());
    }

    #[test]
    fn unreachable_archive_is_a_network_error() {
        let fx = fixture();
        let url = format!("file://{}", fx.archives.join("missing.zip").display());
        let descriptor = PackageDescriptor::new("Missing", "missing", "missing", url);

        let err = fx.installer.install(&descriptor).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[test]
    fn staged_archive_is_removed_after_success() {
        let fx = fixture();
        let url = zip_file_url(&fx.archives, "flat.zip", &[("a.ts", Some("a")), ("b.ts", Some("b"))]);
        let descriptor = PackageDescriptor::new("Flat", "", "a.ts", url);

        fx.installer.install(&descriptor).expect("installs");
        assert_eq!(tree(&fx.root), vec!["a.ts", "b.ts"]);
    }

    #[test]
    fn failing_hook_reports_but_keeps_written_files() {
        let fx = fixture_with(RecordingRunner {
            failing: vec!["pnpm build".to_string()],
            ..Default::default()
        });
        let url = zip_file_url(&fx.archives, "p.zip", &[("p-main/index.ts", Some("x"))]);
        let descriptor = PackageDescriptor::new("P", "p", "p", url);

        let err = fx.installer.install(&descriptor).unwrap_err();
        assert!(matches!(err, InstallError::Command { .. }));
        assert_eq!(tree(&fx.root), vec!["p/", "p/index.ts"]);
    }

    #[test]
    fn unmatched_patterns_are_reported_not_fatal() {
        let fx = fixture();
        let url = zip_file_url(&fx.archives, "u.zip", &[("r/a.ts", Some("a"))]);
        let descriptor =
            PackageDescriptor::new("U", "u", "u", url).with_patterns(["a.ts", "gone.ts"]);

        let report = fx.installer.install(&descriptor).expect("installs");
        assert_eq!(report.unmatched_patterns, vec!["gone.ts".to_string()]);
        assert!(report.summary().contains("gone.ts"));
        assert_eq!(tree(&fx.root), vec!["u/", "u/a.ts"]);
    }
}
