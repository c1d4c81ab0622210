//! Small hand-built maps shared by the unit tests.
//!
//! All rooms are drawn the way map editors draw them: outer walls run
//! clockwise, so the room is on the right-hand (front) side of every line.

use crate::archive::wad::{write_wad, WADType};
use crate::parse::map::{BareDoomLine, BareDoomMap, BareSector, BareSide, BareVertex};

pub fn empty_map() -> BareDoomMap<'static> {
    BareDoomMap {
        vertices: Vec::new(),
        sectors: Vec::new(),
        sides: Vec::new(),
        lines: Vec::new(),
    }
}

pub fn add_vertex(map: &mut BareDoomMap, x: i16, y: i16) -> i16 {
    map.vertices.push(BareVertex { x, y });
    map.vertices.len() as i16 - 1
}

pub fn add_sector(map: &mut BareDoomMap) -> i16 {
    map.sectors.push(BareSector {
        floor_height: 0,
        ceiling_height: 128,
        floor_texture: "FLOOR4_8",
        ceiling_texture: "CEIL3_5",
        light: 160,
        sector_type: 0,
        sector_tag: 0,
    });
    map.sectors.len() as i16 - 1
}

pub fn add_side(map: &mut BareDoomMap, sector: i16) -> i16 {
    map.sides.push(BareSide {
        x_offset: 0,
        y_offset: 0,
        upper_texture: "-",
        lower_texture: "-",
        middle_texture: "STARTAN3",
        sector,
    });
    map.sides.len() as i16 - 1
}

pub fn add_line(map: &mut BareDoomMap, v0: i16, v1: i16, front: i16, back: i16) -> i16 {
    // impassable for one-sided lines, two-sided otherwise
    let flags = if back == -1 { 0x0001 } else { 0x0004 };
    map.lines.push(BareDoomLine {
        v0,
        v1,
        flags,
        special: 0,
        sector_tag: 0,
        front_sidedef: front,
        back_sidedef: back,
    });
    map.lines.len() as i16 - 1
}

/// A closed loop of one-sided walls facing `sector`, through `points` in order.
fn add_loop(map: &mut BareDoomMap, sector: i16, points: &[(i16, i16)]) {
    let first = map.vertices.len() as i16;
    for &(x, y) in points.iter() {
        add_vertex(map, x, y);
    }
    let count = points.len() as i16;
    for i in 0..count {
        let side = add_side(map, sector);
        add_line(map, first + i, first + (i + 1) % count, side, -1);
    }
}

/// A closed loop of two-sided lines, `outside` in front and `inside` behind.
/// The points run counterclockwise so the fronts face out.
fn add_two_sided_loop(map: &mut BareDoomMap, outside: i16, inside: i16, points: &[(i16, i16)]) {
    let first = map.vertices.len() as i16;
    for &(x, y) in points.iter() {
        add_vertex(map, x, y);
    }
    let count = points.len() as i16;
    for i in 0..count {
        let front = add_side(map, outside);
        let back = add_side(map, inside);
        add_line(map, first + i, first + (i + 1) % count, front, back);
    }
}

/// 256 x 256, one sector.
pub fn square_room() -> BareDoomMap<'static> {
    let mut map = empty_map();
    let sector = add_sector(&mut map);
    add_loop(&mut map, sector, &[(0, 0), (0, 256), (256, 256), (256, 0)]);
    map
}

/// The square room with its north-east quarter missing.
pub fn l_shaped_room() -> BareDoomMap<'static> {
    let mut map = empty_map();
    let sector = add_sector(&mut map);
    add_loop(&mut map, sector, &[(0, 0), (0, 256), (128, 256), (128, 128), (256, 128), (256, 0)]);
    map
}

/// The square room with a 64 x 64 pillar in the middle.
pub fn pillar_room() -> BareDoomMap<'static> {
    let mut map = empty_map();
    let sector = add_sector(&mut map);
    add_loop(&mut map, sector, &[(0, 0), (0, 256), (256, 256), (256, 0)]);
    // counterclockwise, so the walls face out into the room
    add_loop(&mut map, sector, &[(96, 96), (160, 96), (160, 160), (96, 160)]);
    map
}

/// The square room with a raised diamond left of centre and a sunken box
/// in the south-east corner, each its own sector behind two-sided lines.
pub fn platform_room() -> BareDoomMap<'static> {
    let mut map = empty_map();
    let room = add_sector(&mut map);
    let diamond = add_sector(&mut map);
    let box_sector = add_sector(&mut map);
    add_loop(&mut map, room, &[(0, 0), (0, 256), (256, 256), (256, 0)]);
    add_two_sided_loop(&mut map, room, diamond, &[(96, 80), (144, 128), (96, 176), (48, 128)]);
    add_two_sided_loop(&mut map, room, box_sector, &[(176, 32), (224, 32), (224, 96), (176, 96)]);
    map
}

/// Two 128 x 128 rooms side by side, sharing the two-sided line x = 128.
pub fn two_rooms() -> BareDoomMap<'static> {
    let mut map = empty_map();
    let west = add_sector(&mut map);
    let east = add_sector(&mut map);
    for &(x, y) in [(0, 0), (0, 128), (128, 128), (128, 0), (256, 128), (256, 0)].iter() {
        add_vertex(&mut map, x, y);
    }

    for &(v0, v1) in [(0, 1), (1, 2), (3, 0)].iter() {
        let side = add_side(&mut map, west);
        add_line(&mut map, v0, v1, side, -1);
    }
    for &(v0, v1) in [(2, 4), (4, 5), (5, 3)].iter() {
        let side = add_side(&mut map, east);
        add_line(&mut map, v0, v1, side, -1);
    }
    let front = add_side(&mut map, west);
    let back = add_side(&mut map, east);
    add_line(&mut map, 2, 3, front, back);
    map
}

/// A complete WAD holding `map` under the marker `name`.
pub fn doom_map_wad(name: &str, map: &BareDoomMap) -> Vec<u8> {
    let mut linedefs: Vec<u8> = Vec::new();
    for line in map.lines.iter() {
        line.write_to(&mut linedefs).unwrap();
    }
    let mut sidedefs: Vec<u8> = Vec::new();
    for side in map.sides.iter() {
        side.write_to(&mut sidedefs).unwrap();
    }
    let mut vertexes: Vec<u8> = Vec::new();
    for vertex in map.vertices.iter() {
        vertex.write_to(&mut vertexes).unwrap();
    }
    let mut sectors: Vec<u8> = Vec::new();
    for sector in map.sectors.iter() {
        sector.write_to(&mut sectors).unwrap();
    }

    let mut buf: Vec<u8> = Vec::new();
    write_wad(&mut buf, WADType::PWAD, &[
        (name, &[][..]),
        ("THINGS", &[][..]),
        ("LINEDEFS", &linedefs[..]),
        ("SIDEDEFS", &sidedefs[..]),
        ("VERTEXES", &vertexes[..]),
        ("SECTORS", &sectors[..]),
    ]).unwrap();
    buf
}
