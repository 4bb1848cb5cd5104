use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use term_tree::components::TextBlock;
use term_tree::drivers::buffer::BufferBackend;
use term_tree::{Expr, Node, NodeId, Tree};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "tree-bench",
    version = env!("CARGO_PKG_VERSION"),
    about = "Layout and damage-limited redraw benchmark over a synthetic node tree"
)]
struct BenchCli {
    /// Children per container.
    #[arg(short = 'b', long = "breadth", default_value_t = 4)]
    breadth: u16,

    /// Levels of containers below the root.
    #[arg(short = 'd', long = "depth", default_value_t = 4)]
    depth: u16,

    /// Redraw passes to time.
    #[arg(short = 'f', long = "frames", default_value_t = 500)]
    frames: u32,

    /// Off-screen buffer width.
    #[arg(long = "cols", default_value_t = 240)]
    cols: u16,

    /// Off-screen buffer height.
    #[arg(long = "rows", default_value_t = 80)]
    rows: u16,

    /// Log tree changes to stderr at debug level (slows the run).
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

struct BenchConfig {
    breadth: u16,
    depth: u16,
    frames: u32,
    screen: Rect,
}

impl TryFrom<&BenchCli> for BenchConfig {
    type Error = String;

    fn try_from(cli: &BenchCli) -> Result<Self, Self::Error> {
        if !(1..=16).contains(&cli.breadth) {
            return Err("breadth must be between 1 and 16".to_string());
        }
        if !(1..=8).contains(&cli.depth) {
            return Err("depth must be between 1 and 8".to_string());
        }
        if cli.frames == 0 {
            return Err("frames must be at least 1".to_string());
        }
        Ok(Self {
            breadth: cli.breadth,
            depth: cli.depth,
            frames: cli.frames,
            screen: Rect::new(0, 0, cli.cols.max(1), cli.rows.max(1)),
        })
    }
}

/// Splits each container into `breadth` columns that fill the space below a
/// one-row caption.
fn populate(tree: &mut Tree, parent: NodeId, breadth: u16, depth: u16, leaves: &mut Vec<NodeId>) {
    if depth == 0 {
        leaves.push(parent);
        return;
    }
    let share = 100.0 / f32::from(breadth);
    for i in 0..breadth {
        let name = format!("{}.{i}", tree.name(parent));
        let node = tree.insert(
            Node::new(name.clone())
                .with_x(Expr::percent(share * f32::from(i)))
                .with_y(1)
                .with_width(Expr::percent(share))
                .with_height(Expr::Fill(0))
                .with_widget(TextBlock::from_lines([name])),
        );
        if tree.add(parent, node).is_err() {
            continue;
        }
        populate(tree, node, breadth, depth - 1, leaves);
    }
}

#[derive(Default)]
struct BenchStats {
    nodes: usize,
    leaves: usize,
    layout_time: Duration,
    frames: u32,
    redraw_time: Duration,
    slowest_redraw: Duration,
}

impl BenchStats {
    fn average_redraw_us(&self) -> f64 {
        if self.frames == 0 {
            return 0.0;
        }
        self.redraw_time.as_secs_f64() / f64::from(self.frames) * 1_000_000.0
    }

    fn final_report(&self, config: &BenchConfig) -> String {
        indoc::formatdoc!(
            r#"
            Tree bench: {nodes} nodes ({leaves} leaves), breadth {breadth}, depth {depth}.
            Screen: {cols}x{rows}
            Initial layout: {layout:.3} ms
            Redraws: {frames} | Avg: {avg:.1} us | Worst: {worst:.1} us
            "#,
            nodes = self.nodes,
            leaves = self.leaves,
            breadth = config.breadth,
            depth = config.depth,
            cols = config.screen.width,
            rows = config.screen.height,
            layout = self.layout_time.as_secs_f64() * 1_000.0,
            frames = self.frames,
            avg = self.average_redraw_us(),
            worst = self.slowest_redraw.as_secs_f64() * 1_000_000.0,
        )
    }
}

/// Deterministic xorshift so runs are comparable.
struct Picker(u64);

impl Picker {
    fn next(&mut self, bound: usize) -> usize {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 % bound.max(1) as u64) as usize
    }
}

fn run(config: &BenchConfig) -> Result<BenchStats, term_tree::TreeError> {
    let mut tree = Tree::new();
    let root = tree.insert(Node::new("root").with_frame(config.screen));
    let mut leaves = Vec::new();
    populate(&mut tree, root, config.breadth, config.depth, &mut leaves);

    let mut stats = BenchStats {
        nodes: tree.len(),
        leaves: leaves.len(),
        ..BenchStats::default()
    };

    let started = Instant::now();
    tree.layout(root)?;
    stats.layout_time = started.elapsed();

    let mut screen = Buffer::empty(config.screen);
    tree.set_needs_display(root)?;
    tree.redraw(root, &mut BufferBackend::new(&mut screen), None)?;

    let mut picker = Picker(0x9E37_79B9_7F4A_7C15);
    for _ in 0..config.frames {
        let leaf = leaves[picker.next(leaves.len())];
        tree.set_needs_display(leaf)?;
        let started = Instant::now();
        tree.redraw(root, &mut BufferBackend::new(&mut screen), None)?;
        let elapsed = started.elapsed();
        stats.frames += 1;
        stats.redraw_time += elapsed;
        stats.slowest_redraw = stats.slowest_redraw.max(elapsed);
    }
    Ok(stats)
}

fn log_level(cli: &BenchCli) -> Level {
    if cli.verbose { Level::DEBUG } else { Level::WARN }
}

fn main() -> ExitCode {
    let args = BenchCli::parse();
    term_tree::tracing_sub::init(log_level(&args));
    let config = match BenchConfig::try_from(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("tree-bench: {err}");
            return ExitCode::from(2);
        }
    };
    match run(&config) {
        Ok(stats) => {
            print!("{}", stats.final_report(&config));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("tree-bench: {err}");
            ExitCode::FAILURE
        }
    }
}
