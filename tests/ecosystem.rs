//! End-to-end scenarios driven through `BoidsManager`.

use approx::assert_relative_eq;
use glam::{Vec2, Vec3};
use rstest::{fixture, rstest};

use boids::{
    AgentId, BoidError, BoidType, BoidsManager, FlatTerrain, MovableState, SimulationParams,
    SpeciesCatalog,
};

#[fixture]
fn manager() -> BoidsManager {
    BoidsManager::new(
        FlatTerrain::default(),
        SpeciesCatalog::default(),
        SimulationParams::default(),
    )
    .expect("default settings are valid")
}

// A boid with full stamina so the Walk table does not send it to sleep
fn rested(manager: &mut BoidsManager, species: BoidType, position: Vec3, velocity: Vec3) -> AgentId {
    let id = manager
        .add_movable_agent(species, position, velocity)
        .expect("species is movable");
    manager
        .agent_mut(id)
        .expect("just added")
        .parameters_mut()
        .stamina_increase_by(100.0);
    id
}

fn state_of(manager: &BoidsManager, id: AgentId) -> MovableState {
    manager.agent(id).expect("agent exists").state()
}

#[rstest]
fn hungry_rabbit_starts_looking_for_food(mut manager: BoidsManager) {
    let rabbit = rested(&mut manager, BoidType::Rabbit, Vec3::ZERO, Vec3::ZERO);
    manager
        .agent_mut(rabbit)
        .unwrap()
        .parameters_mut()
        .hunger_decrease_by(95.0);

    manager.step(0.1);

    assert_eq!(state_of(&manager, rabbit), MovableState::FindFood);
}

#[rstest]
fn visible_wolf_makes_a_rabbit_flee(mut manager: BoidsManager) {
    let rabbit = rested(&mut manager, BoidType::Rabbit, Vec3::ZERO, Vec3::X);
    let wolf = rested(&mut manager, BoidType::Wolf, Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO);

    manager.step(0.1);

    let agent = manager.agent(rabbit).unwrap();
    assert_eq!(agent.state(), MovableState::Flee);
    assert_eq!(agent.hunter(), Some(wolf));
}

#[rstest]
fn exhausted_rabbit_is_killed_and_eaten(mut manager: BoidsManager) {
    let wolf = rested(&mut manager, BoidType::Wolf, Vec3::ZERO, Vec3::ZERO);
    let rabbit = rested(&mut manager, BoidType::Rabbit, Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO);
    {
        let hunter = manager.agent_mut(wolf).unwrap();
        hunter.switch_to_state(MovableState::Attack);
        hunter.set_movable_prey(rabbit);
        hunter.parameters_mut().hunger_decrease_by(70.0);
    }
    manager
        .agent_mut(rabbit)
        .unwrap()
        .parameters_mut()
        .stamina_decrease_by(100.0);

    let report = manager.tick(0.1);

    assert_eq!(report.deaths, 1);
    assert_eq!(report.removed.agents, 1);
    assert!(manager.agent(rabbit).is_none());

    let hunter = manager.agent(wolf).unwrap();
    assert_eq!(hunter.state(), MovableState::Eat);
    let rates = hunter.parameters().species().rates;
    assert_relative_eq!(
        hunter.parameters().hunger(),
        30.0 - rates.hunger.decrease + boids::SpeciesParams::rabbit().food_value,
        epsilon = 1e-3
    );
}

#[rstest]
fn dead_boids_leave_on_removal_and_ids_stay_unique(mut manager: BoidsManager) {
    let first = rested(&mut manager, BoidType::Rabbit, Vec3::ZERO, Vec3::ZERO);
    manager.agent_mut(first).unwrap().kill();

    let removal = manager.remove_expired();
    assert_eq!(removal.agents, 1);
    assert!(manager.agent(first).is_none());

    let second = rested(&mut manager, BoidType::Rabbit, Vec3::ZERO, Vec3::ZERO);
    assert!(second > first);
}

#[rstest]
fn speed_and_force_stay_bounded(mut manager: BoidsManager) {
    manager.scatter_rooted(BoidType::Tree, 10).unwrap();
    manager.scatter_rooted(BoidType::Carrot, 20).unwrap();
    manager.scatter_movable(BoidType::Rabbit, 30).unwrap();
    manager.scatter_movable(BoidType::Wolf, 4).unwrap();

    for _ in 0..200 {
        manager.tick(0.1);
        for agent in manager.movable_boids() {
            let species = agent.parameters().species();
            assert!(agent.position().is_finite());
            assert!(agent.velocity().length() <= species.max_speed + 1e-3);
            assert!(agent.acceleration().length() <= species.max_force / species.mass + 1e-3);
        }
    }
}

#[rstest]
fn rabbit_eats_a_carrot_until_it_is_gone(mut manager: BoidsManager) {
    let carrot = manager
        .add_stationary_resource(BoidType::Carrot, Vec3::new(1.0, 0.0, 0.0))
        .unwrap();
    let rabbit = rested(&mut manager, BoidType::Rabbit, Vec3::ZERO, Vec3::X);
    {
        let agent = manager.agent_mut(rabbit).unwrap();
        agent.switch_to_state(MovableState::FindFood);
        agent.parameters_mut().hunger_decrease_by(95.0);
    }

    let mut ate = false;
    let mut removed = 0;
    for _ in 0..200 {
        let report = manager.tick(0.1);
        ate |= state_of(&manager, rabbit) == MovableState::Eat;
        removed += report.removed.resources;
        if manager.resource(carrot).is_none() {
            break;
        }
    }

    assert!(ate);
    assert_eq!(removed, 1);
    assert!(manager.rooted_boids().is_empty());
    assert_ne!(state_of(&manager, rabbit), MovableState::Eat);
    assert!(manager.agent(rabbit).unwrap().parameters().hunger() > 40.0);
}

#[rstest]
fn thirst_without_a_lake_keeps_walking(mut manager: BoidsManager) {
    let rabbit = rested(&mut manager, BoidType::Rabbit, Vec3::ZERO, Vec3::ZERO);
    manager
        .agent_mut(rabbit)
        .unwrap()
        .parameters_mut()
        .thirst_increase_by(85.0);

    manager.step(0.1);
    assert_eq!(state_of(&manager, rabbit), MovableState::Walk);

    manager.agent_mut(rabbit).unwrap().switch_to_state(MovableState::FindWater);
    manager.step(0.1);
    assert_eq!(state_of(&manager, rabbit), MovableState::Walk);
}

#[rstest]
fn thirsty_rabbit_drinks_at_the_shore() {
    let terrain = FlatTerrain::new(0.0).with_lake(Vec2::new(10.0, 0.0), 5.0);
    let mut manager =
        BoidsManager::new(terrain, SpeciesCatalog::default(), SimulationParams::default()).unwrap();
    let rabbit = rested(&mut manager, BoidType::Rabbit, Vec3::new(4.5, 0.0, 0.0), Vec3::ZERO);
    manager
        .agent_mut(rabbit)
        .unwrap()
        .parameters_mut()
        .thirst_increase_by(85.0);

    manager.step(0.1);
    assert_eq!(state_of(&manager, rabbit), MovableState::FindWater);
    manager.step(0.1);
    assert_eq!(state_of(&manager, rabbit), MovableState::Drink);

    for _ in 0..200 {
        manager.step(0.1);
        if state_of(&manager, rabbit) != MovableState::Drink {
            break;
        }
    }
    let agent = manager.agent(rabbit).unwrap();
    assert_eq!(agent.state(), MovableState::Walk);
    assert!(agent.parameters().thirst() <= agent.parameters().species().thresholds.low_thirst);
}

#[rstest]
fn lone_rabbit_gets_lost_at_night_and_recovers_at_dawn(mut manager: BoidsManager) {
    let rabbit = rested(&mut manager, BoidType::Rabbit, Vec3::ZERO, Vec3::ZERO);

    manager.environment_mut().set_night(true);
    manager.step(0.1);
    assert_eq!(state_of(&manager, rabbit), MovableState::Lost);

    manager.environment_mut().set_night(false);
    manager.step(0.1);
    assert_eq!(state_of(&manager, rabbit), MovableState::Walk);
}

#[rstest]
fn companions_are_never_lost(mut manager: BoidsManager) {
    let a = rested(&mut manager, BoidType::Rabbit, Vec3::ZERO, Vec3::X);
    let b = rested(&mut manager, BoidType::Rabbit, Vec3::new(3.0, 0.0, 0.0), Vec3::NEG_X);

    manager.environment_mut().set_night(true);
    manager.step(0.1);

    assert_ne!(state_of(&manager, a), MovableState::Lost);
    assert_ne!(state_of(&manager, b), MovableState::Lost);
}

#[rstest]
fn mating_pair_produces_one_offspring(mut manager: BoidsManager) {
    let a = rested(&mut manager, BoidType::Rabbit, Vec3::ZERO, Vec3::X);
    let b = rested(&mut manager, BoidType::Rabbit, Vec3::new(1.0, 0.0, 0.0), Vec3::NEG_X);
    for id in [a, b] {
        manager
            .agent_mut(id)
            .unwrap()
            .parameters_mut()
            .affinity_increase_by(95.0);
    }

    let mut births = 0;
    for _ in 0..5 {
        births += manager.tick(0.1).births;
    }

    assert_eq!(births, 1);
    assert_eq!(manager.census().species(BoidType::Rabbit), 3);
}

#[rstest]
#[case(BoidType::Carrot)]
#[case(BoidType::Tree)]
fn rooted_species_cannot_move(mut manager: BoidsManager, #[case] species: BoidType) {
    let result = manager.add_movable_agent(species, Vec3::ZERO, Vec3::ZERO);
    assert_eq!(result, Err(BoidError::NotMovable(species)));
}

#[rstest]
#[case(BoidType::Rabbit)]
#[case(BoidType::Wolf)]
fn movable_species_are_not_resources(mut manager: BoidsManager, #[case] species: BoidType) {
    let result = manager.add_stationary_resource(species, Vec3::ZERO);
    assert_eq!(result, Err(BoidError::NotRooted(species)));
}

#[test]
fn unknown_species_name_is_rejected() {
    let parsed = "dragon".parse::<BoidType>();
    assert_eq!(parsed, Err(BoidError::UnknownSpecies("dragon".to_owned())));
    assert_eq!("Wolf".parse::<BoidType>(), Ok(BoidType::Wolf));
}

#[test]
fn catalog_from_json_is_validated() {
    let json = r#"{ "movable": { "rabbit": { "max_speed": -1.0 } } }"#;
    let catalog: SpeciesCatalog = serde_json::from_str(json).expect("well-formed catalog");

    let result = BoidsManager::new(FlatTerrain::default(), catalog, SimulationParams::default());
    assert!(matches!(
        result,
        Err(BoidError::InvalidParameter {
            species: BoidType::Rabbit,
            field: "max_speed",
            ..
        })
    ));
}

#[test]
fn wolves_loaded_from_json_do_not_fear_each_other() {
    let json = r#"{ "movable": { "wolf": { "max_speed": 6.0, "prey": "rabbit" } } }"#;
    let catalog: SpeciesCatalog = serde_json::from_str(json).expect("well-formed catalog");
    let mut manager =
        BoidsManager::new(FlatTerrain::default(), catalog, SimulationParams::default()).unwrap();
    let a = rested(&mut manager, BoidType::Wolf, Vec3::ZERO, Vec3::X);
    let b = rested(&mut manager, BoidType::Wolf, Vec3::new(5.0, 0.0, 0.0), Vec3::NEG_X);

    manager.step(0.1);

    for id in [a, b] {
        let wolf = manager.agent(id).unwrap();
        assert_ne!(wolf.state(), MovableState::Flee);
        assert_eq!(wolf.hunter(), None);
        assert_eq!(wolf.parameters().species().predator, None);
    }
}

#[test]
fn missing_species_is_reported() {
    let json = r#"{ "movable": { "rabbit": {} } }"#;
    let catalog: SpeciesCatalog = serde_json::from_str(json).unwrap();
    let mut manager =
        BoidsManager::new(FlatTerrain::default(), catalog, SimulationParams::default()).unwrap();

    assert!(manager.add_movable_agent(BoidType::Rabbit, Vec3::ZERO, Vec3::ZERO).is_ok());
    assert_eq!(
        manager.add_movable_agent(BoidType::Wolf, Vec3::ZERO, Vec3::ZERO),
        Err(BoidError::MissingSpecies(BoidType::Wolf))
    );
}
