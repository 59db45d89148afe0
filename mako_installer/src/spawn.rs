use std::collections::{BTreeMap, BTreeSet};

use mako_formats::field::{Gateway, Walkmesh};
use serde::Serialize;

use crate::script::MapJumpEvent;

const COORDINATE_DIVISOR: f32 = 128.0;

/// How the player can arrive: over a walkable trigger line, or because a
/// script teleported them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SpawnOrigin {
    Gateway { index: usize },
    Script {
        entity: String,
        function: String,
        address: usize,
    },
}

/// One way into a destination map, recorded while scanning the map it
/// originates from.
#[derive(Debug, Clone, Serialize)]
pub struct SpawnPoint {
    pub source_field: u16,
    pub source_name: String,
    pub origin: SpawnOrigin,
    pub destination_x: i16,
    pub destination_y: i16,
    /// The raw Z slot is actually a walkmesh triangle index on the
    /// destination map.
    pub destination_triangle: u16,
    pub direction: u8,
}

/// Pass-1 accumulator. Gateways and map jumps from every map land here,
/// keyed by the map they lead *to*; scale factors are collected alongside
/// because the same scan discovers them. Consuming the collector is the
/// only way to get a queryable database, so nothing can read entries
/// before every map has been scanned.
#[derive(Debug, Default)]
pub struct SpawnCollector {
    by_target: BTreeMap<u16, Vec<SpawnPoint>>,
    scales: BTreeMap<u16, f32>,
}

impl SpawnCollector {
    pub fn new() -> Self {
        SpawnCollector::default()
    }

    pub fn record_gateway(
        &mut self,
        source_field: u16,
        source_name: &str,
        index: usize,
        gateway: &Gateway,
    ) {
        self.by_target
            .entry(gateway.destination_field)
            .or_default()
            .push(SpawnPoint {
                source_field,
                source_name: source_name.to_string(),
                origin: SpawnOrigin::Gateway { index },
                destination_x: gateway.destination_x,
                destination_y: gateway.destination_y,
                destination_triangle: gateway.destination_triangle,
                direction: gateway.direction,
            });
    }

    pub fn record_map_jump(&mut self, source_field: u16, source_name: &str, event: &MapJumpEvent) {
        self.by_target
            .entry(event.target_field)
            .or_default()
            .push(SpawnPoint {
                source_field,
                source_name: source_name.to_string(),
                origin: SpawnOrigin::Script {
                    entity: event.entity.clone(),
                    function: event.function.clone(),
                    address: event.address,
                },
                destination_x: event.x,
                destination_y: event.y,
                destination_triangle: event.triangle,
                direction: event.direction,
            });
    }

    pub fn set_scale(&mut self, field: u16, scale: f32) {
        self.scales.insert(field, scale);
    }

    pub fn finish(self) -> SpawnDatabase {
        SpawnDatabase {
            by_target: self.by_target,
            scales: self.scales,
        }
    }
}

/// Read-only snapshot consumed during pass 2. Insertion order within each
/// target's list is discovery order, which keeps the generated spawn names
/// stable between runs.
#[derive(Debug)]
pub struct SpawnDatabase {
    by_target: BTreeMap<u16, Vec<SpawnPoint>>,
    scales: BTreeMap<u16, f32>,
}

impl SpawnDatabase {
    pub fn arrivals(&self, field: u16) -> &[SpawnPoint] {
        self.by_target
            .get(&field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn scale(&self, field: u16) -> Option<f32> {
        self.scales.get(&field).copied()
    }

    pub fn target_count(&self) -> usize {
        self.by_target.len()
    }
}

/// A spawn projected into destination-map world units.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSpawn {
    pub name: String,
    pub source_name: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rotation: f32,
    pub script_origin: bool,
}

#[derive(Debug, Default)]
pub struct ResolvedArrivals {
    pub spawns: Vec<ResolvedSpawn>,
    /// First non-zero position encountered, used when the map is loaded
    /// directly rather than through a gateway.
    pub default_entry: Option<(f32, f32, f32)>,
    pub warnings: Vec<String>,
}

/// Pass 2 for one destination map: name every way in, project coordinates
/// by the destination scale, and take Z from the arrival walkmesh triangle.
/// A triangle index past the mesh clamps to 0 with one warning; it must not
/// cost the map its conversion.
pub fn resolve_arrivals(
    database: &SpawnDatabase,
    field_id: u16,
    scale: f32,
    walkmesh: &Walkmesh,
) -> ResolvedArrivals {
    let divisor = COORDINATE_DIVISOR * scale;
    let mut resolved = ResolvedArrivals::default();

    for point in database.arrivals(field_id) {
        let (name, script_origin) = match &point.origin {
            SpawnOrigin::Gateway { index } => {
                (format!("Spawn_{}_{}", point.source_name, index), false)
            }
            SpawnOrigin::Script {
                entity,
                function,
                address,
            } => (
                format!(
                    "{}_{}_{}_addr_{}",
                    point.source_name, entity, function, address
                ),
                true,
            ),
        };

        let triangle_index = point.destination_triangle as usize;
        let triangle = match walkmesh.triangles.get(triangle_index) {
            Some(triangle) => Some(triangle),
            None => {
                resolved.warnings.push(format!(
                    "spawn {name}: triangle {triangle_index} exceeds walkmesh of {} triangle(s), clamping to 0",
                    walkmesh.triangles.len()
                ));
                walkmesh.triangles.first()
            }
        };
        let raw_z = triangle.map(|t| t.center_z()).unwrap_or(0.0);

        let x = f32::from(point.destination_x) / divisor;
        let y = f32::from(point.destination_y) / divisor;
        let z = raw_z / divisor;
        let rotation = 360.0 * f32::from(point.direction) / 255.0;

        if resolved.default_entry.is_none() && (x != 0.0 || y != 0.0 || z != 0.0) {
            resolved.default_entry = Some((x, y, z));
        }

        resolved.spawns.push(ResolvedSpawn {
            name,
            source_name: point.source_name.clone(),
            x,
            y,
            z,
            rotation,
            script_origin,
        });
    }

    resolved
}

/// `model name (lowercased) → referenced animation names`, accumulated
/// while maps convert and frozen before the model-export phase reads it.
/// Same build-then-query shape as the spawn database.
#[derive(Debug, Default)]
pub struct ModelAnimationCollector {
    by_model: BTreeMap<String, BTreeSet<String>>,
}

impl ModelAnimationCollector {
    pub fn new() -> Self {
        ModelAnimationCollector::default()
    }

    pub fn record(&mut self, model: &str, animations: &[String]) {
        let entry = self.by_model.entry(model.to_ascii_lowercase()).or_default();
        for animation in animations {
            entry.insert(animation.clone());
        }
    }

    pub fn finish(self) -> ModelAnimationSet {
        ModelAnimationSet {
            by_model: self.by_model,
        }
    }
}

#[derive(Debug, Default)]
pub struct ModelAnimationSet {
    by_model: BTreeMap<String, BTreeSet<String>>,
}

impl ModelAnimationSet {
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.by_model.keys().map(String::as_str)
    }

    pub fn animations(&self, model: &str) -> Vec<String> {
        self.by_model
            .get(model)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_model.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_model.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mako_formats::field::WalkmeshTriangle;

    fn gateway(dest: u16, x: i16, y: i16, triangle: u16, direction: u8) -> Gateway {
        Gateway {
            exit_line: [[0; 3]; 2],
            destination_x: x,
            destination_y: y,
            destination_triangle: triangle,
            destination_field: dest,
            direction,
        }
    }

    fn flat_mesh(zs: &[i16]) -> Walkmesh {
        Walkmesh {
            triangles: zs
                .iter()
                .map(|z| WalkmeshTriangle {
                    vertices: [[0, 0, *z, 0]; 3],
                })
                .collect(),
        }
    }

    #[test]
    fn every_scanned_destination_is_reachable_in_the_database() {
        let mut collector = SpawnCollector::new();
        collector.record_gateway(0, "md1stin", 0, &gateway(1, 10, 10, 0, 0));
        collector.record_gateway(0, "md1stin", 1, &gateway(2, 5, 5, 0, 0));
        collector.record_gateway(1, "nrthmk", 0, &gateway(2, -3, 9, 0, 64));

        let database = collector.finish();
        assert_eq!(database.target_count(), 2);
        assert_eq!(database.arrivals(1).len(), 1);
        assert_eq!(database.arrivals(1)[0].source_name, "md1stin");
        let into_two: Vec<_> = database
            .arrivals(2)
            .iter()
            .map(|p| p.source_name.as_str())
            .collect();
        assert_eq!(into_two, vec!["md1stin", "nrthmk"]);
    }

    #[test]
    fn discovery_order_is_preserved_with_script_jumps_appended() {
        let mut collector = SpawnCollector::new();
        collector.record_gateway(0, "md1stin", 3, &gateway(7, 1, 1, 0, 0));
        collector.record_map_jump(
            0,
            "md1stin",
            &MapJumpEvent {
                entity: "door".into(),
                function: "on_talk".into(),
                address: 0x120,
                target_field: 7,
                x: 2,
                y: 2,
                triangle: 0,
                direction: 128,
            },
        );
        let database = collector.finish();
        let arrivals = database.arrivals(7);
        assert!(matches!(arrivals[0].origin, SpawnOrigin::Gateway { index: 3 }));
        assert!(matches!(arrivals[1].origin, SpawnOrigin::Script { .. }));
    }

    #[test]
    fn resolves_names_positions_and_rotation() {
        let mut collector = SpawnCollector::new();
        collector.record_gateway(0, "md1stin", 0, &gateway(1, 256, -512, 1, 255));
        collector.set_scale(1, 2.0);
        let database = collector.finish();

        let mesh = flat_mesh(&[0, 768]);
        let resolved = resolve_arrivals(&database, 1, database.scale(1).unwrap(), &mesh);
        assert!(resolved.warnings.is_empty());
        assert_eq!(resolved.spawns.len(), 1);
        let spawn = &resolved.spawns[0];
        assert_eq!(spawn.name, "Spawn_md1stin_0");
        // 256 / (128 * 2) = 1.0, -512 / 256 = -2.0, triangle z 768 / 256 = 3.0
        assert!((spawn.x - 1.0).abs() < f32::EPSILON);
        assert!((spawn.y + 2.0).abs() < f32::EPSILON);
        assert!((spawn.z - 3.0).abs() < f32::EPSILON);
        assert!((spawn.rotation - 360.0).abs() < f32::EPSILON);
        assert_eq!(resolved.default_entry, Some((1.0, -2.0, 3.0)));
    }

    #[test]
    fn script_spawn_names_are_deterministic_and_distinct_per_source() {
        let event = |address| MapJumpEvent {
            entity: "guard".into(),
            function: "main".into(),
            address,
            target_field: 4,
            x: 0,
            y: 0,
            triangle: 0,
            direction: 0,
        };
        let mut collector = SpawnCollector::new();
        collector.record_map_jump(1, "elevtr1", &event(0x80));
        collector.record_map_jump(2, "rootmap", &event(0x80));
        collector.set_scale(4, 1.0);
        let database = collector.finish();

        let resolved = resolve_arrivals(&database, 4, 1.0, &flat_mesh(&[0]));
        let names: BTreeSet<_> = resolved.spawns.iter().map(|s| s.name.clone()).collect();
        assert_eq!(names.len(), 2, "names from two sources must not collide");
        assert!(names.contains("elevtr1_guard_main_addr_128"));
    }

    #[test]
    fn out_of_range_triangle_clamps_with_exactly_one_warning() {
        let mut collector = SpawnCollector::new();
        collector.record_gateway(0, "md1stin", 0, &gateway(1, 128, 0, 9, 0));
        collector.set_scale(1, 1.0);
        let database = collector.finish();

        let mesh = flat_mesh(&[384]);
        let resolved = resolve_arrivals(&database, 1, 1.0, &mesh);
        assert_eq!(resolved.warnings.len(), 1);
        assert_eq!(resolved.spawns.len(), 1);
        // Clamped to triangle 0: z = 384 / 128 = 3.0.
        assert!((resolved.spawns[0].z - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn default_entry_is_first_non_zero_position() {
        let mut collector = SpawnCollector::new();
        collector.record_gateway(0, "a", 0, &gateway(1, 0, 0, 0, 0));
        collector.record_gateway(0, "a", 1, &gateway(1, 128, 128, 0, 0));
        collector.record_gateway(0, "a", 2, &gateway(1, 256, 256, 0, 0));
        collector.set_scale(1, 1.0);
        let database = collector.finish();

        let resolved = resolve_arrivals(&database, 1, 1.0, &flat_mesh(&[0]));
        assert_eq!(resolved.default_entry, Some((1.0, 1.0, 0.0)));
    }

    #[test]
    fn model_animations_merge_case_insensitively() {
        let mut collector = ModelAnimationCollector::new();
        collector.record("CLOUD.char", &["idle".into(), "run".into()]);
        collector.record("cloud.char", &["walk".into(), "idle".into()]);
        let set = collector.finish();
        assert_eq!(set.len(), 1);
        assert_eq!(set.animations("cloud.char"), vec!["idle", "run", "walk"]);
    }
}
