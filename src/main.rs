/// Terminal-driven flipbook viewer for native builds.
///
/// Usage: `flipbook-native [catalog-id] [page-url]`
///
/// Reads one command per line from stdin: key names (`Right`, `Home`, `+`, `f`, ...),
/// `jump N`, `click X` (X across the page, 0..1), `wait MS`, `status`, `retry`, `quit`.
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::io::BufRead;
    use std::sync::Arc;
    use std::time::Duration;

    use flipbook::config::AppConfig;
    use flipbook::input::{Key, Modifiers};
    use flipbook::{HttpPageDataProvider, MemoryHost, Viewer, logging};
    use flipbook_cache::{
        CacheCoordinator, CacheStore, CoordinatorConfig, DiskStore, MemoryStore, UreqFetcher,
    };
    use web_time::Instant;

    let config = match AppConfig::load_from_default_path() {
        Some(config) => config,
        None => {
            let config = AppConfig::new();
            // Leave an editable file behind on first run.
            if let Err(e) = config.save_to_default_path() {
                eprintln!("Could not write default config: {}", e);
            }
            config
        }
    };
    logging::init(config.viewer.log_level);
    let viewer_config = config.viewer;

    let mut args = std::env::args().skip(1);
    let catalog_id = args.next();
    let page_url = args
        .next()
        .unwrap_or_else(|| format!("{}/catalog", viewer_config.api_origin()));

    let store: Arc<dyn CacheStore> = match DiskStore::default_root().map(DiskStore::open) {
        Some(Ok(store)) => Arc::new(store),
        Some(Err(e)) => {
            log::warn!("Disk cache unavailable ({}), caching in memory", e);
            Arc::new(MemoryStore::new())
        }
        None => Arc::new(MemoryStore::new()),
    };
    let coordinator = match CacheCoordinator::spawn(
        store,
        Arc::new(UreqFetcher::new()),
        CoordinatorConfig::default(),
    ) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            eprintln!("Failed to start cache coordinator: {}", e);
            return;
        }
    };
    let cache = coordinator.handle();
    let fetcher: Arc<dyn flipbook_cache::Fetcher> = Arc::new(cache.clone());
    let provider = HttpPageDataProvider::new(Arc::clone(&fetcher), viewer_config.api_origin());

    let mut viewer = Viewer::new(
        viewer_config,
        Arc::new(provider),
        fetcher,
        MemoryHost::new(page_url),
        console::ConsoleFlipEngine::default(),
    )
    .with_cache(cache);
    if let Some(id) = catalog_id {
        viewer = viewer.with_catalog_id(id);
    }
    viewer.set_focused(true);

    if let Err(e) = viewer.load(Instant::now()) {
        log::debug!("Load error: {}", e);
    }
    console::settle(&mut viewer, Duration::from_secs(30));
    if viewer.phase().is_error() {
        eprintln!("{}", viewer.phase().status_text());
    }
    console::print_view(&viewer);

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };
        let line = line.trim();
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
        let now = Instant::now();

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "jump" => {
                if !viewer.submit_jump(arg.trim(), now) {
                    println!("No page matches '{}'", arg.trim());
                }
            }
            "click" => {
                let x = arg.trim().parse::<f32>().unwrap_or(0.75);
                println!("{:?}", viewer.handle_click(x, now));
            }
            "wait" => {
                let ms = arg.trim().parse::<u64>().unwrap_or(1000);
                console::run_for(&mut viewer, Duration::from_millis(ms));
            }
            "status" => match viewer.cache_status(Duration::from_secs(5)) {
                Ok(status) => {
                    for (bucket, count) in status {
                        println!("{:>24}  {}", bucket, count);
                    }
                }
                Err(e) => println!("Cache status unavailable: {}", e),
            },
            "retry" => {
                if let Err(e) = viewer.retry(now) {
                    println!("Retry failed: {}", e);
                }
                console::settle(&mut viewer, Duration::from_secs(30));
            }
            name => match Key::from_name(name) {
                Some(key) => {
                    if viewer.handle_key(key, Modifiers::default(), false, now).is_none() {
                        println!("'{}' does nothing here", name);
                    }
                }
                None => println!("Unknown command '{}'", name),
            },
        }

        viewer.tick(Instant::now());
        console::print_view(&viewer);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod console {
    use std::time::Duration;

    use flipbook::loader::PageRender;
    use flipbook::{Host, PageFlipEngine, Viewer};
    use web_time::Instant;

    /// Flips instantly and reports each turn on stdout.
    #[derive(Debug, Default)]
    pub struct ConsoleFlipEngine {
        flipped: Vec<usize>,
    }

    impl PageFlipEngine for ConsoleFlipEngine {
        fn turn_to_page(&mut self, index: usize) {
            println!("~ flip to page {}", index + 1);
            self.flipped.push(index);
        }

        fn take_flip_events(&mut self) -> Vec<usize> {
            std::mem::take(&mut self.flipped)
        }
    }

    /// Tick until the initial load finishes (or fails, or times out).
    pub fn settle<H: Host>(viewer: &mut Viewer<H, ConsoleFlipEngine>, limit: Duration) {
        let deadline = Instant::now() + limit;
        while viewer.phase().is_loading() && Instant::now() < deadline {
            viewer.tick(Instant::now());
            std::thread::sleep(Duration::from_millis(16));
        }
    }

    /// Tick at roughly 60 fps for `duration`; lets auto-play and jumps run.
    pub fn run_for<H: Host>(viewer: &mut Viewer<H, ConsoleFlipEngine>, duration: Duration) {
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            viewer.tick(Instant::now());
            std::thread::sleep(Duration::from_millis(16));
        }
    }

    pub fn print_view<H: Host>(viewer: &Viewer<H, ConsoleFlipEngine>) {
        let phase = viewer.phase();
        if !phase.is_ready() {
            println!("[{:>3}%] {}", phase.progress(), phase.status_text());
            return;
        }

        let toolbar = viewer.toolbar();
        let current = viewer.navigation().current_page();
        let cells: Vec<String> = viewer
            .render_plan()
            .iter()
            .enumerate()
            .map(|(i, page)| {
                let cell = match page {
                    PageRender::Image { loaded: true, .. } => "#",
                    PageRender::Image { loaded: false, .. } => "+",
                    PageRender::Placeholder { .. } => ".",
                    PageRender::Failed { .. } => "x",
                };
                if i == current {
                    format!("[{}]", cell)
                } else {
                    cell.to_string()
                }
            })
            .collect();

        let buttons: Vec<&str> = toolbar
            .items
            .iter()
            .filter(|item| item.enabled)
            .map(|item| item.title)
            .collect();
        let badge = viewer
            .page_badge(current)
            .map(|n| format!("p.{}", n))
            .unwrap_or_else(|| "p.-".to_string());
        println!(
            "{}  {}  zoom {}  {}  {}",
            toolbar.indicator,
            badge,
            toolbar.zoom_label,
            viewer.host().current_url(),
            cells.join("")
        );
        log::debug!("Enabled: {}", buttons.join(", "));
    }
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}
