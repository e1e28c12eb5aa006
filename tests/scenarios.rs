//! End-to-end decision scenarios on the sandbox engine
//!
//! Each test drives one component the way its job does inside the player:
//! - A forced building type is committed to as soon as one field allows it
//! - A flag that can never reach a warehouse is given up after the grace period
//! - An idle production site above its bootstrap count is dismantled
//! - Warehouse distances accumulate along a chain of roads

use ahash::AHashSet;
use colony_ai::core::config::{LifecycleConfig, PlannerConfig, RoadConfig, SurveyConfig};
use colony_ai::core::types::{BuildSize, PlayerNumber};
use colony_ai::core::Coords;
use colony_ai::economy::EconomyGraph;
use colony_ai::engine::{Command, GameEngine, SandboxWorld};
use colony_ai::lifecycle::{ReviewInputs, SiteKind, SiteLifecycleManager};
use colony_ai::planner::{BuildingCatalog, ConstructionPlanner, Necessity, PlanningInputs, Role};
use colony_ai::roads::{FlagDistances, RoadGraph, RoadMaintainer};
use colony_ai::scoring::WeightedScoring;
use colony_ai::survey::{FieldSurvey, SettlementOutlook, SurveyInputs};

const ME: PlayerNumber = PlayerNumber(1);

// ============================================================================
// Construction
// ============================================================================

/// A forced type with exactly one usable field gets built in the first cycle
#[test]
fn test_forced_type_committed_on_only_field() {
    let mut catalog = BuildingCatalog::new();
    let well = catalog.add_type("well", BuildSize::Small, Role::Producer);
    catalog.get_mut(well).unwrap().forced_after = Some(1_000);

    // Two owned fields: the building spot and the spot for its flag
    let mut world = SandboxWorld::new(ME);
    world.add_land(Coords::new(0, 0), 0, Some(ME));
    world.add_land(Coords::new(0, 1), 0, Some(ME));
    world.set_time(2_000);

    let scoring = WeightedScoring::new();
    let outlook = SettlementOutlook::default();
    let enemies = AHashSet::new();
    let mut survey = FieldSurvey::new(SurveyConfig::default());
    survey.refresh_unusable(&world, 2_000);
    let inputs = SurveyInputs {
        engine: &world,
        catalog: &catalog,
        scoring: &scoring,
        outlook: &outlook,
        enemies: &enemies,
    };
    survey.refresh_buildable(&inputs, 2_000);
    assert_eq!(survey.buildable_count(), 1);

    let mut planner = ConstructionPlanner::new(PlannerConfig::default(), 200, &catalog);
    let distances = FlagDistances::new();
    let inputs = PlanningInputs {
        survey: &survey,
        distances: &distances,
        scoring: &scoring,
        outlook: &outlook,
        vacant_soldier_positions: 0,
    };
    let action = planner
        .plan_cycle(&mut world, &mut catalog, &inputs, 2_000)
        .expect("forced type should be committed");

    assert_eq!(action.building_type, well);
    assert_eq!(action.location, Coords::new(0, 0));
    assert!(action.score > 0);
    assert_eq!(catalog.get(well).unwrap().necessity, Necessity::Forced);
    assert!(world.issued.contains(&Command::Build {
        building_type: well,
        at: Coords::new(0, 0),
    }));
    assert!(planner.bounds().is_ordered());
}

// ============================================================================
// Roads
// ============================================================================

/// A building on an island cut off from every warehouse loses its flag once
/// the grace period is over
#[test]
fn test_stranded_economy_removed_after_grace() {
    let mut catalog = BuildingCatalog::new();
    let hq = catalog.add_type("headquarters", BuildSize::Big, Role::Warehouse { port: false });
    let hut = catalog.add_type("woodcutter", BuildSize::Small, Role::Producer);

    let mut world = SandboxWorld::new(ME);
    world.add_land(Coords::new(0, 0), 4, Some(ME));
    world.add_land(Coords::new(12, 0), 2, Some(ME));
    world.place_site(hq, Coords::new(0, 0), true).unwrap();
    let island = world.place_site(hut, Coords::new(12, 0), true).unwrap();
    let island_flag = world.site(island).unwrap().flag;

    let config = RoadConfig::default();
    let mut roads = RoadMaintainer::new(config.clone());
    let mut economies = EconomyGraph::new();

    let mut road_check = |world: &mut SandboxWorld, now: u64| -> bool {
        let mut graph = RoadGraph::snapshot(&*world, &catalog);
        economies.check(&graph, now);
        roads.improve_roads(world, &mut graph, &economies, false, now)
    };

    // No path exists, but the grace period has not run out
    assert!(!road_check(&mut world, 0));
    assert!(world.has_site(island));

    assert!(road_check(&mut world, config.disconnected_grace + 1));
    assert!(!world.has_flag(island_flag));
    assert!(!world.has_site(island));
    assert!(world.issued.contains(&Command::RemoveFlag { flag: island_flag }));
}

// ============================================================================
// Site lifecycle
// ============================================================================

/// A production site stuck at 0% is dismantled once it is old enough, as
/// long as more of its type stand than the bootstrap amount
#[test]
fn test_idle_production_site_dismantled() {
    let mut catalog = BuildingCatalog::new();
    let planks = catalog.add_ware("planks", 10);
    let hq = catalog.add_type("headquarters", BuildSize::Big, Role::Warehouse { port: false });
    let sawmill = catalog.add_type("sawmill", BuildSize::Medium, Role::Producer);
    {
        let p = catalog.get_mut(sawmill).unwrap();
        p.outputs = vec![planks];
        p.basic_amount = 1;
    }

    let mut world = SandboxWorld::new(ME);
    world.add_land(Coords::new(0, 0), 8, Some(ME));
    let hq_site = world.place_site(hq, Coords::new(0, 0), true).unwrap();
    let first = world.place_site(sawmill, Coords::new(4, 0), true).unwrap();
    let second = world.place_site(sawmill, Coords::new(-4, 0), true).unwrap();
    let hq_flag = world.site(hq_site).unwrap().flag;
    for site in [first, second] {
        let flag = world.site(site).unwrap().flag;
        world.connect(hq_flag, flag).unwrap();
    }
    world.site_mut(second).unwrap().statistics_percent = 80;

    let config = LifecycleConfig::default();
    let now = config.min_age_production;
    world.set_time(now);
    let mut economies = EconomyGraph::new();
    economies.check(&RoadGraph::snapshot(&world, &catalog), now);

    let scoring = WeightedScoring::new();
    let inputs = ReviewInputs {
        catalog: &catalog,
        economies: &economies,
        scoring: &scoring,
        basic_economy_complete: true,
    };
    let mut manager = SiteLifecycleManager::new(config);
    assert!(manager.review_site(SiteKind::Production, &mut world, &inputs, now));

    // Connected to a warehouse: dismantled, not bulldozed
    assert!(world.issued.contains(&Command::Dismantle { site: first }));
    assert!(!world.has_site(first));
    assert!(world.has_site(second));
    assert_eq!(manager.stats.dismantled, 1);
}

// ============================================================================
// Flag distances
// ============================================================================

/// Distances along a chain of three flags add up; an unconnected flag has none
#[test]
fn test_distances_along_flag_chain() {
    let mut catalog = BuildingCatalog::new();
    let hq = catalog.add_type("headquarters", BuildSize::Big, Role::Warehouse { port: false });

    let mut world = SandboxWorld::new(ME);
    world.add_land(Coords::new(0, 0), 8, Some(ME));
    let hq_site = world.place_site(hq, Coords::new(0, 0), true).unwrap();
    let hq_flag = world.site(hq_site).unwrap().flag;
    let middle = world.place_flag(Coords::new(3, 1)).unwrap();
    let end = world.place_flag(Coords::new(6, 1)).unwrap();
    let first_road = world.connect(hq_flag, middle).unwrap();
    let second_road = world.connect(middle, end).unwrap();
    let lonely = world.place_flag(Coords::new(0, -5)).unwrap();

    let d1 = world.road(first_road).unwrap().steps();
    let d2 = world.road(second_road).unwrap().steps();
    assert!(d1 > 0 && d2 > 0);

    let mut roads = RoadMaintainer::new(RoadConfig::default());
    let graph = RoadGraph::snapshot(&world, &catalog);
    let report = roads.check_flag_distances(&graph, 0);

    assert_eq!(report.warehouses, 1);
    assert_eq!(roads.distances().distance(hq_flag), Some(0));
    assert_eq!(roads.distances().distance(middle), Some(d1));
    assert_eq!(roads.distances().distance(end), Some(d1 + d2));
    assert_eq!(roads.distances().distance(lonely), None);
    assert_eq!(roads.distances().get(end).map(|d| d.warehouse), Some(hq_flag));
}
