//! One-shot entity listing.

use anyhow::Result;
use owo_colors::OwoColorize;
use sot_core::{
    DomainLayer, EntityEnumerator, EntityKind, Features, MemoryReader, NameResolver, OffsetTable,
};

pub fn run(config: &sot_core::Config, pid: Option<u32>, filter: Option<&str>) -> Result<()> {
    let offsets = super::load_offsets(config)?;
    let mapping = super::load_mapping(config)?;
    let process = super::attach(config, pid)?;
    let reader = MemoryReader::new(&process);
    let anchors = super::anchors(config, &reader, false)?;

    // Classification only; no display objects are built
    let listing = listing_layer(mapping, &offsets, config)?;

    let mut names = NameResolver::new(anchors.global_names.address);
    let mut enumerator = EntityEnumerator::from_world(&reader, anchors.world.address, &offsets)?;
    let records = enumerator.enumerate(&reader, &mut names);

    let camera = enumerator.camera();
    println!(
        "Observer at ({:.1}, {:.1}, {:.1}), yaw {:.1}, fov {:.0}",
        camera.position.x, camera.position.y, camera.position.z, camera.rotation.yaw, camera.fov
    );
    println!();

    let mut shown = 0usize;
    for record in &records {
        if filter.is_some_and(|f| !record.raw_name.contains(f)) {
            continue;
        }
        shown += 1;

        let kind = listing.classify(&record.raw_name);
        let kind_label = format!("{:<12}", kind.to_string());
        let kind_label = match kind {
            EntityKind::Ship => kind_label.cyan().to_string(),
            EntityKind::PlayerState => kind_label.green().to_string(),
            EntityKind::CrewService => kind_label.yellow().to_string(),
            EntityKind::Other => kind_label.dimmed().to_string(),
        };

        let display_name = listing.display_name(record);
        print!(
            "0x{:012X} {:>8} {} {}",
            record.address, record.identity, kind_label, record.raw_name
        );
        if display_name != record.raw_name {
            print!(" {}", format!("({})", display_name).bold());
        }
        println!();
    }

    println!();
    println!(
        "{} of {} entities, {} names cached",
        shown,
        records.len(),
        names.cached()
    );
    Ok(())
}

fn listing_layer(
    mapping: sot_core::DomainMapping,
    offsets: &OffsetTable,
    config: &sot_core::Config,
) -> Result<DomainLayer> {
    let features = Features {
        ships: false,
        world_players: false,
        crews: false,
    };
    Ok(DomainLayer::new(mapping, offsets, features, config.screen.resolve())?)
}
