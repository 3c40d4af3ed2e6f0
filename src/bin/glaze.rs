use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use tracing::{error, info, warn};

use glaze::{BrowserView, Extent, GlazeError, GlazeResult, Shell, ShellOpts, WebEngine};

#[derive(Parser, Debug)]
#[command(name = "glaze", version, about = "Composite an embedded web view with local layers")]
struct Cli {
    /// Initial content to load (local file path or URL).
    page: Option<String>,

    /// Shell configuration JSON; individual flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    #[arg(long)]
    fps: Option<u32>,

    /// Alpha-blend the browser layer instead of overwriting with it.
    #[arg(long)]
    transparent: bool,

    /// Bouncing-ball layer count.
    #[arg(long)]
    balls: Option<u32>,

    /// Stop after this many seconds (escape also stops the shell).
    #[arg(long)]
    run_secs: Option<u64>,

    /// Write the last presented frame to this PNG on exit.
    #[arg(long)]
    screenshot: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();

    let mut opts = match &cli.config {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            serde_json::from_reader::<_, ShellOpts>(BufReader::new(file))
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => ShellOpts::default(),
    };
    if let Some(width) = cli.width {
        opts.width = width;
    }
    if let Some(height) = cli.height {
        opts.height = height;
    }
    if let Some(fps) = cli.fps {
        opts.fps = fps;
    }
    if let Some(balls) = cli.balls {
        opts.balls = balls;
    }
    if cli.transparent {
        opts.transparent = true;
    }

    let shell = Shell::new(&opts, |view| {
        Ok(Arc::new(PatternEngine::new(view)) as Arc<dyn WebEngine>)
    })
    .context("wiring shell")?;

    let viewer = shell.viewer();
    if let Some(secs) = cli.run_secs {
        let close = shell.close_handle();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(secs));
            info!(secs, "run time elapsed, closing");
            close.close();
        });
    }

    let page = cli.page.clone().unwrap_or_else(|| "index.html".to_string());
    shell.run(&page).context("running shell")?;

    if let Some(path) = &cli.screenshot {
        let extent = viewer.extent();
        image::save_buffer(
            path,
            &viewer.snapshot(),
            extent.width,
            extent.height,
            image::ExtendedColorType::Rgba8,
        )
        .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "screenshot written");
    }

    Ok(())
}

/// Stand-in engine session: delivers animated full-frame paint updates
/// into the view the way a real embedded engine would, and logs the input
/// it is handed.
struct PatternEngine {
    view: Arc<BrowserView>,
    stop: Arc<AtomicBool>,
    painter: Mutex<Option<JoinHandle<()>>>,
}

impl PatternEngine {
    fn new(view: Arc<BrowserView>) -> Self {
        Self {
            view,
            stop: Arc::new(AtomicBool::new(false)),
            painter: Mutex::new(None),
        }
    }
}

impl WebEngine for PatternEngine {
    fn load(&self, location: &str) -> GlazeResult<()> {
        let mut painter = self.painter.lock().unwrap_or_else(|p| p.into_inner());
        if painter.is_some() {
            return Err(GlazeError::input("demo engine already has content loaded"));
        }

        let seed = match std::fs::read(location) {
            Ok(bytes) => bytes.len() as u32,
            Err(err) => {
                warn!(location, %err, "content not readable, using default pattern");
                0
            }
        };
        info!(location, "loading content");

        let view = Arc::clone(&self.view);
        let stop = Arc::clone(&self.stop);
        let handle = std::thread::Builder::new()
            .name("glaze-demo-paint".into())
            .spawn(move || {
                let extent = view.extent();
                let mut frame = vec![0u8; extent.byte_len()];
                let mut n: u32 = 0;
                while !stop.load(Ordering::Acquire) {
                    paint_pattern(&mut frame, extent, n, seed);
                    let rect = view.view_rect();
                    if let Err(err) = view.on_paint(&[rect], &frame, extent.width, extent.height) {
                        error!(%err, "paint rejected");
                        break;
                    }
                    n = n.wrapping_add(1);
                    std::thread::sleep(Duration::from_millis(33));
                }
            })
            .map_err(|e| GlazeError::input(format!("failed to spawn demo painter: {e}")))?;

        *painter = Some(handle);
        Ok(())
    }

    fn send_pointer_move(&self, _x: i32, _y: i32) {}

    fn send_pointer_button(&self, button: glaze::PointerButton, x: i32, y: i32, pressed: bool) {
        info!(?button, x, y, pressed, "pointer button reached engine");
    }

    fn send_key(&self, code: u32, pressed: bool) {
        info!(code, pressed, "key reached engine");
    }

    fn pump_work(&self) {}

    fn close(&self) {
        self.stop.store(true, Ordering::Release);
        let handle = self
            .painter
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

fn paint_pattern(frame: &mut [u8], extent: Extent, n: u32, seed: u32) {
    let bar = n.wrapping_mul(4) % extent.width.max(1);
    for y in 0..extent.height {
        for x in 0..extent.width {
            let off = (y as usize * extent.width as usize + x as usize) * 4;
            let (r, g, b, a) = if x.abs_diff(bar) < 12 {
                (255, 255, 255, 255)
            } else {
                // translucent wash (premultiplied) so local layers show
                // through in transparent mode
                (40, ((x ^ seed) % 97) as u8, (y % 97) as u8, 96)
            };
            frame[off..off + 4].copy_from_slice(&pack_engine_px(r, g, b, a));
        }
    }
}

// inverse of the shell's channel permutation: presentation (r,g,b,a)
// packed into the byte order the engine delivers
fn pack_engine_px(r: u8, g: u8, b: u8, a: u8) -> [u8; 4] {
    [g, b, a, r]
}
