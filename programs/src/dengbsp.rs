use std::io::Write;
use std::ops::ControlFlow;

use svg::node::element::path::Data;
use svg::node::element::{Group, Line, Path, Rectangle, Style};
use svg::node::Node;
use svg::Document;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;

use dengbsp::errors::{Error, Result};
use dengbsp::geom::{BBox, BBoxExt, Point};
use dengbsp::{BareMap, BareWAD, BuildConfig, Map, WADMapEntryBlock};

mod input_buffer;
use crate::input_buffer::InputBuffer;

fn main() {
    match run() {
        Ok(()) => {}
        Err(err) => {
            drop(write_err(err));
            std::process::exit(1);
        }
    }
}

fn write_err(err: Error) -> Result<()> {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
    write!(&mut stderr, "error: ")?;
    stderr.set_color(&ColorSpec::new())?;
    writeln!(&mut stderr, "{}", err)?;
    for cause in err.iter().skip(1) {
        writeln!(&mut stderr, "  caused by: {}", cause)?;
    }
    if let Some(backtrace) = err.backtrace() {
        writeln!(&mut stderr, "{:?}", backtrace)?;
    }
    Ok(())
}

fn run() -> Result<()> {
    let args = clap_app!(dengbsp =>
        (about: "Build BSP trees and blockmaps for Doom maps")
        (@arg verbose: -v --verbose "Log build details")
        (@arg cell_size: --("cell-size") +takes_value "Blockmap cell size in map units (default 128)")
        (@arg split_cost: --("split-cost") +takes_value "Cost of splitting a seg when choosing partitions (default 7)")
        (@arg no_prune: --("no-prune") "Keep unused vertices, sidedefs and sectors")
        (@arg file: +required "Input WAD file, or - for stdin")
        (@subcommand info =>
            (about: "Build every map in the WAD and summarize the results")
        )
        (@subcommand chart =>
            (about: "Render an SVG of a built map")
            (@arg map: +required "Map name, e.g. E1M1 or MAP01")
            (@arg outfile: +required "Output file")
        )
        (@subcommand locate =>
            (about: "Find the subsector containing a point")
            (@arg map: +required "Map name, e.g. E1M1 or MAP01")
            (@arg x: +required +allow_hyphen_values "X coordinate")
            (@arg y: +required +allow_hyphen_values "Y coordinate")
        )
    ).get_matches();

    let level = if args.is_present("verbose") { log::LevelFilter::Debug } else { log::LevelFilter::Warn };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let config = build_config(&args);

    // clap already insists on it
    let filename = args.value_of("file").unwrap_or("-");
    let input = match filename {
        "-" => InputBuffer::new_from_stdin()?,
        f => InputBuffer::new_from_file(f)?,
    };

    let wad = dengbsp::parse_wad(input.bytes())?;

    match args.subcommand() {
        ("info", Some(_)) => do_info(&wad, &config)?,
        ("chart", Some(subargs)) => do_chart(subargs, &wad, &config)?,
        ("locate", Some(subargs)) => do_locate(subargs, &wad, &config)?,
        _ => {
            println!("{}", args.usage());
        }
    }

    Ok(())
}

fn build_config(args: &clap::ArgMatches) -> BuildConfig {
    let mut config = BuildConfig::default();
    if args.is_present("cell_size") {
        config.blockmap_cell_size = value_t!(args, "cell_size", f64).unwrap_or_else(|e| e.exit());
        if config.blockmap_cell_size <= 0.0 {
            clap::Error::value_validation_auto("cell size must be positive".to_owned()).exit();
        }
    }
    if args.is_present("split_cost") {
        config.split_cost_factor = value_t!(args, "split_cost", u64).unwrap_or_else(|e| e.exit());
    }
    if args.is_present("no_prune") {
        config.prune = false;
    }
    config
}

fn build_map(wad: &BareWAD, block: &WADMapEntryBlock, config: &BuildConfig) -> Result<Map> {
    match dengbsp::parse_doom_map(wad, block)? {
        BareMap::Doom(bare) => Map::from_bare(&bare, config),
        BareMap::Hexen(bare) => Map::from_bare(&bare, config),
    }
}

fn do_info(wad: &BareWAD, config: &BuildConfig) -> Result<()> {
    println!("{:?} with {} lumps", wad.header.identification, wad.header.numlumps);

    for block in wad.iter_maps() {
        let map = match build_map(wad, &block, config) {
            Ok(map) => map,
            Err(err) => {
                // One broken map shouldn't hide the rest
                println!("{} - failed to load: {}", block.name, err);
                continue;
            }
        };
        let stats = map.stats();
        let height = map.bsp().root().map_or(0, |root| map.bsp().height(root));
        let miniseg_count = map.segs().iter().filter(|seg| seg.is_miniseg()).count();

        println!();
        println!("{} - {:?} format map", block.name, block.format);
        println!("  {} vertices, {} lines, {} sides, {} sectors",
            map.vertices().len(), map.lines().len(), map.sides().len(), map.sectors().len());
        println!("  {} segs ({} minisegs), {} subsectors",
            map.segs().len(), miniseg_count, map.subsectors().len());
        println!("  {} BSP nodes, tree height {}, {} splits, built in {:.2?}",
            stats.nodes, height, stats.splits, stats.elapsed);
        println!("  blockmap {}x{} at {} units",
            map.blockmap().width(), map.blockmap().height(), map.blockmap().cell_size());
    }

    Ok(())
}

fn do_chart(subargs: &clap::ArgMatches, wad: &BareWAD, config: &BuildConfig) -> Result<()> {
    let name = subargs.value_of("map").unwrap_or_default();
    let block = wad.find_map(name)?;
    let map = build_map(wad, &block, config)?;

    let doc = map_as_svg(&map);
    let outfile = subargs.value_of("outfile").unwrap_or_default();
    svg::save(outfile, &doc)?;
    info!("Wrote {} to {}", block.name, outfile);
    Ok(())
}

fn map_as_svg(map: &Map) -> Document {
    let mut group = Group::new();

    let blockmap = map.blockmap();
    for y in 0..blockmap.height() {
        for x in 0..blockmap.width() {
            let cell = blockmap.cell_bounds(x, y);
            let class = if blockmap.cell(x, y).is_empty() { "blockmap-cell empty" } else { "blockmap-cell" };
            group.append(
                Rectangle::new()
                .set("x", cell.min.x)
                .set("y", cell.min.y)
                .set("width", cell.width())
                .set("height", cell.height())
                .set("class", class)
            );
        }
    }

    for (handle, subsector) in map.iter_subsectors() {
        let mut data = Data::new();
        let segs = map.subsector_segs(handle);
        if let Some(first) = segs.first() {
            let (start, _) = map.seg_endpoints(first);
            data = data.move_to((start.x, start.y));
            for seg in segs.iter() {
                let (_, end) = map.seg_endpoints(seg);
                data = data.line_to((end.x, end.y));
            }
            data = data.close();
        }
        let class = if subsector.sector().is_some() { "subsector" } else { "subsector sectorless" };
        let mut path = Path::new().set("d", data).set("class", class);
        path.assign("data-subsector", handle.index());
        group.append(path);
    }

    let mut classes = Vec::new();
    for line in map.iter_lines() {
        classes.clear();
        let (v0, v1) = line.vertex_indices();
        let (v0, v1) = (map.vertex(v0), map.vertex(v1));
        classes.push("line");
        classes.push(if line.is_two_sided() { "two-sided" } else { "one-sided" });
        if line.has_special() {
            classes.push("has-special");
        }
        group.append(
            Line::new()
            .set("x1", v0.x)
            .set("y1", v0.y)
            .set("x2", v1.x)
            .set("y2", v1.y)
            .set("class", classes.join(" "))
        );
    }

    // Both halves of a miniseg pair cover the same stretch; draw one
    for (index, seg) in map.segs().iter().enumerate() {
        if !seg.is_miniseg() || seg.partner().map_or(false, |partner| partner.index() < index) {
            continue;
        }
        let (start, end) = map.seg_endpoints(seg);
        group.append(
            Line::new()
            .set("x1", start.x)
            .set("y1", start.y)
            .set("x2", end.x)
            .set("y2", end.y)
            .set("class", "miniseg")
        );
    }

    // Doom's y-axis points up, but SVG's points down, so flip the whole map
    group.assign("transform", "scale(1 -1)");
    let bounds = blockmap.bounds();
    Document::new()
        .set("viewBox", (bounds.min.x, -bounds.max.y, bounds.width(), bounds.height()))
        .add(Style::new(include_str!("map-svg.css")))
        .add(group)
}

fn do_locate(subargs: &clap::ArgMatches, wad: &BareWAD, config: &BuildConfig) -> Result<()> {
    let name = subargs.value_of("map").unwrap_or_default();
    let x = value_t!(subargs, "x", f64).unwrap_or_else(|e| e.exit());
    let y = value_t!(subargs, "y", f64).unwrap_or_else(|e| e.exit());
    let point = Point::new(x, y);

    let block = wad.find_map(name)?;
    let map = build_map(wad, &block, config)?;

    if !map.bounds().contains_point(point) {
        println!("({}, {}) lies outside {}", x, y, block.name);
    }
    match map.subsector_at(point) {
        Some(handle) => {
            let subsector = map.subsector(handle);
            let bbox = subsector.bbox();
            println!("subsector {}: {} segs, bounds ({}, {}) to ({}, {})",
                handle, subsector.seg_range().len(), bbox.min.x, bbox.min.y, bbox.max.x, bbox.max.y);
            match subsector.sector() {
                Some(sector) => {
                    let sector_data = map.sector(sector);
                    println!("  sector {}: floor {} {}, ceiling {} {}, light {}",
                        sector, sector_data.floor_height, sector_data.floor_texture,
                        sector_data.ceiling_height, sector_data.ceiling_texture, sector_data.light);
                }
                None => println!("  no sector"),
            }
        }
        None => println!("{} has no BSP", block.name),
    }

    match map.blockmap().cell_coords(point) {
        Some((cx, cy)) => {
            let cell: Vec<_> = map.blockmap().cell(cx, cy).iter().map(|handle| handle.to_string()).collect();
            println!("blockmap cell ({}, {}): [{}]", cx, cy, cell.join(", "));
        }
        None => println!("outside the blockmap"),
    }

    let mut nearby = Vec::new();
    let spot = BBox::new(point, point);
    let _ = map.subsectors_in_box(&spot, |handle, _| -> ControlFlow<()> {
        nearby.push(handle.to_string());
        ControlFlow::Continue(())
    });
    println!("subsectors whose bounds touch the point: [{}]", nearby.join(", "));
    Ok(())
}
