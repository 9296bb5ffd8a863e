pub struct Lumen {}

static LUMEN_STATIC: std::sync::OnceLock<LumenStatic> = std::sync::OnceLock::new();

struct LumenStatic {}

impl LumenStatic {
    fn init(app_name: &str) -> &'static Self {
        LUMEN_STATIC.get_or_init(|| {
            env_logger::builder()
                .filter_level(log::LevelFilter::Info)
                .filter_module("wgpu_core", log::LevelFilter::Warn)
                .filter_module("wgpu_hal", log::LevelFilter::Warn)
                .filter_module("naga", log::LevelFilter::Warn)
                .parse_default_env()
                .init();

            log::info!("Starting {app_name} {}", env!("CARGO_PKG_VERSION"));

            Self {}
        })
    }
}

impl Lumen {
    /// Installs process wide logging. Safe to call more than once.
    pub fn new(app_name: &str) -> Self {
        LumenStatic::init(app_name);

        Self {}
    }

    /// Turns on collection of the profiling scopes every render pass opens.
    pub fn enable_profiling(&self) {
        puffin::set_scopes_on(true);
        log::info!("Profiling scopes enabled");
    }
}
