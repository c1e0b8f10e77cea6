//! Loads a JSON map, builds the brush lists of every hull and prints a
//! summary. Optionally writes the BSPX brush list lump.
//!
//! ```text
//! brush-dump [-v] [--options options.json] [--bspx brushlist.bin] map.json
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use brush_bsp::contents::ContentFlags;
use brush_bsp::map::{EntityPairs, FacePlane, Map, MapBrush, MapEntity, TexInfo};
use brush_bsp::{CompileContext, FnVisitor, Hull, Options, Plane, PlaneTable};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct JsonMap {
    entities: Vec<JsonEntity>,
}

#[derive(Debug, Deserialize)]
struct JsonEntity {
    #[serde(default)]
    pairs: EntityPairs,
    #[serde(default)]
    brushes: Vec<JsonBrush>,
}

#[derive(Debug, Deserialize)]
struct JsonBrush {
    #[serde(default)]
    line: usize,
    faces: Vec<JsonFace>,
}

/// A face as written in a map file: three points clockwise seen from outside.
#[derive(Debug, Deserialize)]
struct JsonFace {
    points: [[f64; 3]; 3],
    texture: String,
    #[serde(default)]
    flags: i32,
    #[serde(default)]
    contents: i32,
}

#[derive(Debug, Default, Serialize)]
struct HullSummary {
    models: usize,
    brushes: usize,
    sides: usize,
}

#[derive(Debug, Serialize)]
struct Summary {
    game: String,
    entities: usize,
    models: usize,
    planes: usize,
    hulls: BTreeMap<String, HullSummary>,
    collision_planes: usize,
    collision_brushes: usize,
    collision_sides: usize,
    bspx_models: Option<usize>,
}

struct Args {
    map: PathBuf,
    options: Option<PathBuf>,
    bspx: Option<PathBuf>,
    verbose: bool,
}

fn parse_args() -> Result<Args> {
    let mut map = None;
    let mut options = None;
    let mut bspx = None;
    let mut verbose = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            "--options" => options = Some(args.next().context("--options needs a path")?.into()),
            "--bspx" => bspx = Some(args.next().context("--bspx needs a path")?.into()),
            flag if flag.starts_with('-') => bail!("unknown flag {flag}"),
            path => map = Some(PathBuf::from(path)),
        }
    }

    Ok(Args {
        map: map.context("usage: brush-dump [-v] [--options FILE] [--bspx FILE] MAP.json")?,
        options,
        bspx,
        verbose,
    })
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing {}", path.display()))
}

fn point(p: [f64; 3]) -> Point3<f64> {
    Point3::new(p[0], p[1], p[2])
}

fn load_brush(map: &mut Map, brush: &JsonBrush, options: &Options) -> Result<MapBrush> {
    let mut sides = Vec::with_capacity(brush.faces.len());
    for face in &brush.faces {
        let [a, b, c] = face.points;
        let plane = Plane::from_map_points(point(a), point(b), point(c))
            .with_context(|| format!("line {}: face with collinear points", brush.line))?;
        sides.push(FacePlane {
            plane,
            texinfo: map.add_texinfo(TexInfo::new(face.texture.as_str(), face.flags)),
            contents: ContentFlags::new(face.contents),
        });
    }
    Ok(MapBrush::from_planes(&mut map.planes, &sides, options.world_extent, brush.line))
}

fn load_map(json: JsonMap, options: &Options) -> Result<Map> {
    if json.entities.is_empty() {
        bail!("map has no entities");
    }

    let mut map = Map::new();
    for entity in json.entities {
        let brushes = entity
            .brushes
            .iter()
            .map(|b| load_brush(&mut map, b, options))
            .collect::<Result<Vec<_>>>()?;
        map.add_entity(MapEntity::new(entity.pairs, brushes));
    }

    if !map.world().is_classname("worldspawn") {
        log::warn!("first entity is {:?}, not worldspawn", map.world().classname());
    }
    Ok(map)
}

fn main() -> Result<()> {
    let args = parse_args()?;

    let level = if args.verbose { log::Level::Debug } else { log::Level::Info };
    simple_logger::init_with_level(level).context("initialising logger")?;

    let options: Options = match &args.options {
        Some(path) => read_json(path)?,
        None => Options::default(),
    };
    log::debug!("{options:?}");

    let map = load_map(read_json(&args.map)?, &options)?;
    log::info!("{} entities, {} texinfos", map.entities.len(), map.texinfos.len());

    let mut ctx = CompileContext::new(map, options);

    let mut hulls: BTreeMap<String, HullSummary> = BTreeMap::new();
    let mut visitor = FnVisitor::new(|hull: Hull, _: usize, entity: &MapEntity, _: &PlaneTable| {
        let summary = hulls.entry(hull.to_string()).or_default();
        summary.models += 1;
        summary.brushes += entity.brushes.len();
        summary.sides += entity.brushes.iter().map(|b| b.sides.len()).sum::<usize>();
    });
    ctx.create_hulls(&mut visitor)?;
    drop(visitor);

    let bspx = ctx.create_bspx_brush_list()?;
    let bspx_models = bspx.as_ref().map(|lump| lump.models().len());

    if let (Some(lump), Some(path)) = (&bspx, &args.bspx) {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        lump.write_to(&mut writer)?;
        writer.flush()?;
        log::info!("wrote {}", path.display());
    } else if args.bspx.is_some() {
        log::warn!("--bspx given but bspx_brushes is off in the options");
    }

    let summary = Summary {
        game: ctx.options.game.to_string(),
        entities: ctx.map.entities.len(),
        models: ctx.num_models,
        planes: ctx.map.planes.len(),
        hulls,
        collision_planes: ctx.collision.planes.len(),
        collision_brushes: ctx.collision.brushes.len(),
        collision_sides: ctx.collision.sides.len(),
        bspx_models,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
