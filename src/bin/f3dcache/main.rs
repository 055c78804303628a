//! f3dcache CLI - Tool for inspecting and writing fluid cache files.

use std::env;
use std::path::Path;

use field3d_cache::codec::{channel_id, resolve_encoding, StaggeredLayout};
use field3d_cache::prelude::*;
use field3d_cache::util::DVec3;
use tracing::{debug, info, Level};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = Level::INFO;
    let mut quiet = false;
    let mut read_mode = ReadMode::Mapped;
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = Level::DEBUG,
            "-vv" | "--trace" => level = Level::TRACE,
            "-q" | "--quiet" => quiet = true,
            "-b" | "--buffered" => read_mode = ReadMode::Buffered,
            _ => filtered_args.push(arg),
        }
    }

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let json_mode = filtered_args.iter().any(|&s| s == "--json" || s == "-j");
    init_tracing(if quiet || json_mode { None } else { Some(level) });
    filtered_args.retain(|&s| s != "--json" && s != "-j");

    let result = match filtered_args[0] {
        "info" | "i" => match filtered_args.get(1) {
            Some(path) => cmd_info(path, read_mode),
            None => usage("f3dcache info <file.f3d>"),
        },
        "channels" | "c" => match filtered_args.get(1) {
            Some(path) => cmd_channels(path, filtered_args.get(2).copied(), read_mode),
            None => usage("f3dcache channels <file.f3d> [owner]"),
        },
        "dump" | "d" => match (filtered_args.get(1), filtered_args.get(2)) {
            (Some(path), Some(channel)) => cmd_dump(path, channel, json_mode, read_mode),
            _ => usage("f3dcache dump <file.f3d> <owner_channel> [--json]"),
        },
        "demo" => match filtered_args.get(1) {
            Some(path) => match demo_config(&filtered_args[2..]) {
                Some(config) => cmd_demo(path, config),
                None => usage("f3dcache demo <out.f3d> [dense|sparse] [half|float]"),
            },
            None => usage("f3dcache demo <out.f3d> [dense|sparse] [half|float]"),
        },
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        // A cache file alone is the same as `info`
        path if path.ends_with(".f3d") => cmd_info(path, read_mode),
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!("Run 'f3dcache help' for usage.");
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(level: Option<Level>) {
    let Some(level) = level else {
        return;
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("field3d_cache={},f3dcache={}", level, level)));
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter);
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn usage(text: &str) -> Result<()> {
    eprintln!("Error: missing argument");
    eprintln!("Usage: {}", text);
    std::process::exit(1);
}

fn print_help() {
    println!("f3dcache - Fluid cache toolkit");
    println!();
    println!("USAGE:");
    println!("    f3dcache [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info     <file>                    Show metadata, layers and grid size");
    println!("    c, channels <file> [owner]            List channels in read order");
    println!("    d, dump     <file> <owner_channel>    Print a channel's decoded values");
    println!("    demo        <out> [dense|sparse] [half|float]");
    println!("                                          Write a synthetic fluid cache");
    println!("    h, help                               Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Suppress log output");
    println!("    -j, --json       JSON output for dump");
    println!("    -b, --buffered   Read through a file handle instead of mmap");
    println!();
    println!("EXAMPLES:");
    println!("    f3dcache demo fluidShape1Frame1.f3d sparse half");
    println!("    f3dcache info fluidShape1Frame1.f3d");
    println!("    f3dcache dump fluidShape1Frame1.f3d fluidShape1_density --json");
    println!();
    println!("NOTES:");
    println!("    - Passing a .f3d file directly is equivalent to 'info'");
    println!("    - RUST_LOG overrides the log level");
}

fn cmd_info(path: &str, read_mode: ReadMode) -> Result<()> {
    info!("Opening cache: {}", path);
    let mut input = Field3dInputFile::new();
    input.set_read_mode(read_mode);
    input.open(Path::new(path))?;

    println!("Cache: {}", path);
    println!("Version: {}", input.version().unwrap_or(0));
    if let Some(frame) = field3d_cache::session::frame_from_path(Path::new(path)) {
        println!("Frame: {}", frame);
    }
    println!("Resolution: {}", field3d_cache::codec::fields_resolution(&input));
    println!();

    println!("Metadata:");
    for (key, value) in input.metadata().iter() {
        println!("  {}: {}", key, value);
    }
    println!();

    for partition in &input.index().partitions {
        println!("Partition '{}':", partition.name);
        for entry in &partition.layers {
            let h = &entry.header;
            let encoding = match resolve_encoding(&input, &h.meta.attribute) {
                Ok(e) => e.to_string(),
                Err(e) => format!("unsupported ({})", e),
            };
            println!(
                "  {:<12} {:<18} {:<6} {}  [{}]",
                h.meta.attribute, h.class_name, h.data_type.to_string(), h.resolution, encoding
            );
        }
    }
    println!();
    println!("Total layers: {}", input.index().layer_count());
    Ok(())
}

fn read_session(path: &str, read_mode: ReadMode) -> Result<ChannelSession<SceneGraph>> {
    let config = SessionConfig::default().with_read_mode(read_mode);
    let mut session = ChannelSession::new(SceneGraph::new(), config);
    session.open(path, AccessMode::Read)?;
    Ok(session)
}

fn cmd_channels(path: &str, owner: Option<&str>, read_mode: ReadMode) -> Result<()> {
    let mut session = read_session(path, read_mode)?;
    let owner = match owner {
        Some(o) => o.to_string(),
        None => session.input().partition_names().into_iter().next().unwrap_or_default(),
    };
    debug!("Listing channels of '{}'", owner);

    // Seeds the owner the channel list is built for.
    session.find_channel_name(&channel_id(&owner, ChannelKind::Resolution.name()))?;
    while let Some(name) = session.read_channel_name()? {
        println!("{:<32} {}", name, session.read_array_size()?);
    }
    session.close()
}

fn cmd_dump(path: &str, channel: &str, json_mode: bool, read_mode: ReadMode) -> Result<()> {
    let mut session = read_session(path, read_mode)?;
    session.find_channel_name(channel)?;
    let size = session.read_array_size()?;
    let mut values = Vec::new();
    session.read_float_array(&mut values, size)?;
    session.close()?;

    if json_mode {
        let out = serde_json::json!({
            "file": path,
            "channel": channel,
            "size": size,
            "values": values,
        });
        match serde_json::to_string_pretty(&out) {
            Ok(s) => println!("{}", s),
            Err(e) => return Err(Error::other(e.to_string())),
        }
    } else {
        println!("{} ({} values)", channel, size);
        for (i, row) in values.chunks(8).enumerate() {
            let line: Vec<String> = row.iter().map(|v| format!("{:>10.4}", v)).collect();
            println!("  {:>6}: {}", i * 8, line.join(" "));
        }
    }
    Ok(())
}

fn demo_config(args: &[&str]) -> Option<SessionConfig> {
    let mut storage = StorageConfig::default();
    for arg in args {
        match *arg {
            "dense" => storage.sparse = false,
            "sparse" => storage.sparse = true,
            "half" => storage.precision = Precision::Half,
            "float" => storage.precision = Precision::Float,
            _ => return None,
        }
    }
    Some(SessionConfig::new(storage))
}

/// A soft ball of smoke rising through a 16^3 grid.
fn demo_fluid(owner: &str) -> FluidContainer {
    let n = 16;
    let res = Resolution::new(n, n, n);
    let center = (n as f32 - 1.0) * 0.5;
    let radius = n as f32 * 0.35;

    let mut density = Vec::with_capacity(res.voxel_count());
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                let d = ((i as f32 - center).powi(2) + (j as f32 - center).powi(2) + (k as f32 - center).powi(2)).sqrt();
                density.push((1.0 - d / radius).max(0.0));
            }
        }
    }
    let temperature: Vec<f32> = density.iter().map(|d| d * 2.0).collect();
    let coord: [Vec<f32>; 3] = [0, 1, 2].map(|axis| {
        (0..res.voxel_count())
            .map(|idx| {
                let c = [idx % n, (idx / n) % n, idx / (n * n)];
                c[axis] as f32 / n as f32
            })
            .collect()
    });
    let color = [density.clone(), density.clone(), vec![1.0; res.voxel_count()]];
    let [u_len, v_len, w_len] = StaggeredLayout::new(res).component_lens();

    FluidContainer::new(owner, res)
        .with_dimensions(DVec3::splat(4.0))
        .with_attribute("dynamicOffsetY", 1.5)
        .with_scalar(ChannelKind::Density, density)
        .with_scalar(ChannelKind::Temperature, temperature)
        .with_vector(ChannelKind::Color, color)
        .with_vector(ChannelKind::Coord, coord)
        .with_vector(ChannelKind::Velocity, [vec![0.0; u_len], vec![0.5; v_len], vec![0.0; w_len]])
}

fn cmd_demo(path: &str, config: SessionConfig) -> Result<()> {
    let owner = "fluidShape1";
    let fluid = demo_fluid(owner);
    let channels = fluid.channels();
    let scene = SceneGraph::new().with(fluid);

    info!("Writing demo cache: {} ({})", path, config.storage);
    let mut session = ChannelSession::new(&scene, config);
    session.open(path, AccessMode::Write)?;
    session.write_channel_name(&channel_id(owner, ChannelKind::Resolution.name()));
    session.write_header()?;
    for kind in channels {
        session.write_channel_name(&channel_id(owner, kind.name()));
        session.write_float_array(&[])?;
        debug!("Wrote {}", kind);
    }
    session.close()?;

    println!("Wrote {} channels to {}", scene.nodes()[0].channels().len(), path);
    Ok(())
}
