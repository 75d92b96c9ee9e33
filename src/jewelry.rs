// src/jewelry.rs - Product catalog, current selection and background image loading
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::error::Result;

pub type JewelryImage = Arc<RgbaImage>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JewelryKind {
    Earring,
    Necklace,
}

impl JewelryKind {
    pub const ALL: [JewelryKind; 2] = [JewelryKind::Earring, JewelryKind::Necklace];

    pub fn label(self) -> &'static str {
        match self {
            JewelryKind::Earring => "Earring",
            JewelryKind::Necklace => "Necklace",
        }
    }

    fn directory(self) -> &'static str {
        match self {
            JewelryKind::Earring => "earrings",
            JewelryKind::Necklace => "necklaces",
        }
    }

    fn file_stem(self) -> &'static str {
        match self {
            JewelryKind::Earring => "earring",
            JewelryKind::Necklace => "necklace",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JewelryItem {
    pub kind: JewelryKind,
    /// 1-based position within its kind.
    pub number: usize,
    pub path: PathBuf,
}

impl JewelryItem {
    pub fn label(&self) -> String {
        format!("{} {}", self.kind.label(), self.number)
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<JewelryItem>,
}

impl Catalog {
    pub const ITEMS_PER_KIND: usize = 5;

    /// Builds the catalog from `<assets>/earrings/earring{n}.png` and
    /// `<assets>/necklaces/necklace{n}.png`.
    pub fn new(assets_dir: impl AsRef<Path>) -> Self {
        let assets_dir = assets_dir.as_ref();
        let items = JewelryKind::ALL
            .iter()
            .flat_map(|&kind| {
                (1..=Self::ITEMS_PER_KIND).map(move |number| JewelryItem {
                    kind,
                    number,
                    path: assets_dir
                        .join(kind.directory())
                        .join(format!("{}{}.png", kind.file_stem(), number)),
                })
            })
            .collect();

        Self { items }
    }

    pub fn items(&self) -> &[JewelryItem] {
        &self.items
    }

    pub fn items_of(&self, kind: JewelryKind) -> impl Iterator<Item = &JewelryItem> {
        self.items.iter().filter(move |item| item.kind == kind)
    }
}

/// Which kind is being tried on, and the last loaded image for each kind.
#[derive(Debug, Clone)]
pub struct Selection {
    pub mode: JewelryKind,
    earring: Option<JewelryImage>,
    necklace: Option<JewelryImage>,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            mode: JewelryKind::Earring,
            earring: None,
            necklace: None,
        }
    }
}

impl Selection {
    pub fn image(&self, kind: JewelryKind) -> Option<&JewelryImage> {
        match kind {
            JewelryKind::Earring => self.earring.as_ref(),
            JewelryKind::Necklace => self.necklace.as_ref(),
        }
    }

    pub fn set_image(&mut self, kind: JewelryKind, image: Option<JewelryImage>) {
        match kind {
            JewelryKind::Earring => self.earring = image,
            JewelryKind::Necklace => self.necklace = image,
        }
    }

    /// Image for the current mode, if one has loaded.
    pub fn active_image(&self) -> Option<&JewelryImage> {
        self.image(self.mode)
    }
}

struct LoadResult {
    kind: JewelryKind,
    request: u64,
    path: PathBuf,
    image: Option<JewelryImage>,
}

/// Decodes jewelry images off the render thread.
///
/// Only the most recent request per kind is applied to the selection; a
/// slower earlier load finishing afterwards is discarded.
pub struct JewelryLoader {
    runtime: Runtime,
    tx: UnboundedSender<LoadResult>,
    rx: UnboundedReceiver<LoadResult>,
    cache: HashMap<PathBuf, JewelryImage>,
    latest: HashMap<JewelryKind, u64>,
    next_request: u64,
    pending: usize,
}

impl JewelryLoader {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("jewelry-loader")
            .enable_all()
            .build()?;
        let (tx, rx) = unbounded_channel();

        Ok(Self {
            runtime,
            tx,
            rx,
            cache: HashMap::new(),
            latest: HashMap::new(),
            next_request: 0,
            pending: 0,
        })
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Switches the mode to the item's kind and starts loading its image.
    pub fn select(&mut self, item: &JewelryItem, selection: &mut Selection) {
        selection.mode = item.kind;

        let request = self.next_request;
        self.next_request += 1;
        self.latest.insert(item.kind, request);

        if let Some(cached) = self.cache.get(&item.path) {
            selection.set_image(item.kind, Some(cached.clone()));
            return;
        }

        let tx = self.tx.clone();
        let kind = item.kind;
        let path = item.path.clone();
        self.pending += 1;
        self.runtime.spawn_blocking(move || {
            let image = load_jewelry_image(&path);
            let _ = tx.send(LoadResult {
                kind,
                request,
                path,
                image,
            });
        });
    }

    /// Applies finished loads to `selection`. Returns how many were applied.
    pub fn poll(&mut self, selection: &mut Selection) -> usize {
        let mut applied = 0;
        while let Ok(result) = self.rx.try_recv() {
            if self.apply(result, selection) {
                applied += 1;
            }
        }
        applied
    }

    fn apply(&mut self, result: LoadResult, selection: &mut Selection) -> bool {
        self.pending = self.pending.saturating_sub(1);
        if let Some(image) = &result.image {
            self.cache.insert(result.path.clone(), image.clone());
        }

        if self.latest.get(&result.kind) != Some(&result.request) {
            debug!(path = %result.path.display(), "discarding stale jewelry load");
            return false;
        }

        selection.set_image(result.kind, result.image);
        true
    }

    #[cfg(test)]
    fn wait_one(&mut self, selection: &mut Selection) -> bool {
        match self.rx.blocking_recv() {
            Some(result) => self.apply(result, selection),
            None => false,
        }
    }
}

/// Loads an image, resolving to `None` when it is missing or undecodable.
pub fn load_jewelry_image(path: &Path) -> Option<JewelryImage> {
    match image::open(path) {
        Ok(img) => {
            info!(path = %path.display(), width = img.width(), height = img.height(), "loaded jewelry image");
            Some(Arc::new(img.to_rgba8()))
        }
        Err(e) => {
            warn!(path = %path.display(), "failed to load jewelry image: {}", e);
            None
        }
    }
}
