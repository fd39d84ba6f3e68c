#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use overlay_keeper_lib::config::AppSettings;
use overlay_keeper_lib::core::copier::CopySettings;
use overlay_keeper_lib::core::registry::AppRegistry;
use overlay_keeper_lib::core::remote::RemoteSource;
use overlay_keeper_lib::models::error::SError;
use overlay_keeper_lib::models::event::ModEvent;
use overlay_keeper_lib::utils::context::EventSink;
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

pub const API: &str = "http://api.test/posts/";

/// Blocks package downloads until released, so tests can observe an in-flight download.
pub struct Gate {
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

/// In-memory stand-in for the mod site and the patch server.
#[derive(Default)]
pub struct FakeSource {
    pub posts: Mutex<HashMap<String, Result<String, String>>>,
    pub files: Mutex<HashMap<String, Vec<u8>>>,
    pub originals: Mutex<HashMap<Utf8PathBuf, Vec<u8>>>,
    gate: Mutex<Option<Gate>>,
}

impl FakeSource {
    pub fn set_post(&self, url: &str, json: String) {
        self.posts.lock().unwrap().insert(url.to_string(), Ok(json));
    }

    pub fn fail_post(&self, url: &str) {
        self.posts
            .lock()
            .unwrap()
            .insert(url.to_string(), Err("connection refused".into()));
    }

    pub fn set_file(&self, url: &str, bytes: Vec<u8>) {
        self.files.lock().unwrap().insert(url.to_string(), bytes);
    }

    pub fn set_original(&self, rel: &str, bytes: &[u8]) {
        self.originals
            .lock()
            .unwrap()
            .insert(rel.into(), bytes.to_vec());
    }

    /// Returns (entered, release): `entered` fires when a package download starts, the
    /// download continues once `release` is sent.
    pub fn install_gate(&self) -> (Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = channel();
        let (release_tx, release_rx) = channel();
        *self.gate.lock().unwrap() = Some(Gate {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        (entered_rx, release_tx)
    }

    fn wait_at_gate(&self, url: &str) {
        if !url.ends_with(".zip") {
            return;
        }
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.lock().unwrap().send(()).unwrap();
            gate.release.lock().unwrap().recv().unwrap();
        }
    }
}

impl RemoteSource for FakeSource {
    fn fetch_text(&self, url: &str) -> Result<String, SError> {
        match self.posts.lock().unwrap().get(url) {
            Some(Ok(json)) => Ok(json.clone()),
            Some(Err(e)) => Err(SError::Network(e.clone())),
            None => Err(SError::Network(format!("404 {url}"))),
        }
    }

    fn download(
        &self,
        url: &str,
        dest: &Utf8Path,
        progress: &mut dyn FnMut(u8),
        cancel: &AtomicBool,
    ) -> Result<u64, SError> {
        self.wait_at_gate(url);
        if cancel.load(Ordering::SeqCst) {
            return Err(SError::Cancelled);
        }

        let bytes = self
            .files
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| SError::Network(format!("404 {url}")))?;

        std::fs::create_dir_all(dest.parent().unwrap())?;
        std::fs::write(dest, &bytes)?;
        progress(50);
        progress(100);
        Ok(bytes.len() as u64)
    }

    fn fetch_original(&self, rel: &Utf8Path, dest: &Utf8Path) -> Result<(), SError> {
        let bytes = self
            .originals
            .lock()
            .unwrap()
            .get(rel)
            .cloned()
            .ok_or_else(|| SError::Network(format!("no original for {rel}")))?;
        std::fs::create_dir_all(dest.parent().unwrap())?;
        std::fs::write(dest, bytes)?;
        Ok(())
    }
}

pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn post_json(id: u32, slug: &str, title: &str, modified: &str, compatible: &str) -> String {
    format!(
        r#"{{
            "id": {id},
            "slug": "{slug}",
            "title": {{ "rendered": "{title}" }},
            "content": {{ "rendered": "<p>{title} description</p>" }},
            "author_name": "tester",
            "modified": "{modified}",
            "compatible": "{compatible}",
            "image": "http://cdn.test/{slug}.png",
            "File": "http://cdn.test/{slug}.zip"
        }}"#
    )
}

pub struct TestEnv {
    pub tmp: TempDir,
    pub home: Utf8PathBuf,
    /// The `win32` directory mods are applied to.
    pub target: Utf8PathBuf,
    pub settings: AppSettings,
    pub source: Arc<FakeSource>,
    pub events: EventSink,
    pub rx: UnboundedReceiver<ModEvent>,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();

        let home = root.join("home");
        let bin = root.join("game/pso2_bin");
        let target = bin.join("data/win32");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(bin.join("pso2.exe"), "exe").unwrap();

        let mut settings = AppSettings::with_home(home.clone());
        settings.api_base_url = API.to_string();
        settings.copy = CopySettings {
            chunk_size: 16,
            ring_slots: 4,
        };

        let (events, rx) = EventSink::channel();

        Self {
            tmp,
            home,
            target,
            settings,
            source: Arc::new(FakeSource::default()),
            events,
            rx,
        }
    }

    pub fn app(&self) -> AppRegistry {
        AppRegistry::initialize(
            &self.settings,
            &self.target,
            self.source.clone(),
            self.events.clone(),
        )
        .unwrap()
    }

    pub fn reopen(&self) -> Result<Option<AppRegistry>, SError> {
        AppRegistry::open(&self.settings, self.source.clone(), self.events.clone())
    }

    /// Publishes a compatible post plus its thumbnail and archive. Returns the post URL.
    pub fn publish(&self, id: u32, slug: &str, entries: &[(&str, &[u8])]) -> String {
        self.publish_at(id, slug, "2020-01-01T10:00:00", entries)
    }

    pub fn publish_at(
        &self,
        id: u32,
        slug: &str,
        modified: &str,
        entries: &[(&str, &[u8])],
    ) -> String {
        let url = format!("{API}{id}");
        let title = slug.replace('-', " ");
        self.source
            .set_post(&url, post_json(id, slug, &title, modified, "Yes"));
        self.source
            .set_file(&format!("http://cdn.test/{slug}.png"), b"\x89PNG fake".to_vec());
        self.source
            .set_file(&format!("http://cdn.test/{slug}.zip"), build_zip(entries));
        url
    }

    pub fn write_target(&self, rel: &str, content: &[u8]) {
        let path = self.target.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    pub fn read_target(&self, rel: &str) -> Option<Vec<u8>> {
        std::fs::read(self.target.join(rel)).ok()
    }

    pub fn drain_events(&mut self) -> Vec<ModEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}
