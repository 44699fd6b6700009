mod ui;
mod engine;
mod model;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = ui::settings_io::load_settings();
    let app = ui::app::ClayApp::new(settings)
        .map_err(|e| eframe::Error::AppCreation(e.into()))?;

    let options = eframe::NativeOptions::default();

    eframe::run_native(
        "ClayDungeon",
        options,
        Box::new(|_cc| {
            Ok(Box::new(app))
        }),
    )
}
