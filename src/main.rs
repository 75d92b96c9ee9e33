// src/main.rs
use eframe::egui;
use tracing::{error, info, warn};

use jewelry_tryon::app::TryOnApp;
use jewelry_tryon::jewelry::JewelryLoader;
use jewelry_tryon::settings::AppSettings;
use jewelry_tryon::video;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    if let Ok(p) = std::env::current_exe() {
        info!("Running from: {}", p.display());
    }

    match video::list_cameras() {
        Ok(cameras) => {
            info!("Found {} camera(s)", cameras.len());
            for (i, name) in cameras.iter().enumerate() {
                info!("  [{}] {}", i, name);
            }
        }
        Err(e) => warn!("{:#}", e),
    }

    let settings = AppSettings::load_or_default();
    let loader = JewelryLoader::new()?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([960.0, 640.0]),
        centered: true,
        ..Default::default()
    };

    let result = eframe::run_native(
        "Jewelry Try-On",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(create_visuals());
            Box::new(TryOnApp::new(cc, settings, loader))
        }),
    );

    if let Err(e) = result {
        error!("Error running application: {:?}", e);
    }
    Ok(())
}

fn create_visuals() -> egui::Visuals {
    let mut visuals = egui::Visuals::dark();

    visuals.widgets.noninteractive.bg_fill = egui::Color32::from_rgb(30, 30, 35);
    visuals.widgets.inactive.bg_fill = egui::Color32::from_rgb(45, 45, 52);
    visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(58, 54, 48);
    visuals.widgets.active.bg_fill = egui::Color32::from_rgb(198, 160, 82);
    visuals.selection.bg_fill = egui::Color32::from_rgb(150, 120, 60);

    visuals.widgets.noninteractive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.inactive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.hovered.rounding = egui::Rounding::same(8.0);
    visuals.widgets.active.rounding = egui::Rounding::same(8.0);

    visuals.window_rounding = egui::Rounding::same(12.0);
    visuals.menu_rounding = egui::Rounding::same(8.0);

    visuals
}
