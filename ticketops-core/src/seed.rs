//! Synthetic dataset seeder
//!
//! Generates the classifier hierarchy and a batch of synthetic tickets whose
//! histories follow the production scenario distribution: most tickets get
//! assigned and moved to in-progress, a majority of those are closed within
//! two weeks, a small fraction are reopened by the reporter and half of the
//! reopened ones are reassigned. Derived fields come from the history
//! projection, so every seeded document honors the invariants.
//!
//! All randomness flows through the caller's RNG; a seeded `StdRng` makes a
//! run fully deterministic.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::db::Database;
use crate::error::Result;
use crate::history;
use crate::taxonomy::{child_of, root};
use crate::types::{
    Classifications, Classifier, CreatedDetails, DerivedFields, Event, Ticket, TicketState,
};

/// Seeding parameters.
#[derive(Debug, Clone, Copy)]
pub struct SeedOptions {
    /// Number of tickets to generate
    pub count: usize,
    /// Anchor for creation timestamps; tickets are created in the 90 days
    /// before this instant
    pub base_time: DateTime<Utc>,
}

/// Outcome of a seed run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedSummary {
    pub classifiers: usize,
    pub tickets: usize,
}

const PROBLEMS: &[(&str, &str)] = &[
    ("No water supply", "No running water in the unit"),
    ("Water leak", "There is a leak in the {}"),
    ("Electrical fault", "Power keeps tripping"),
    ("Elevator out of service", "The elevator is not working"),
    ("Excessive noise", "Neighbors making constant noise"),
    ("Garbage buildup", "Garbage has not been collected"),
    ("Damaged gate", "The main gate does not close"),
    ("Air conditioning", "The AC unit does not cool properly"),
    ("Pest infestation", "Pests found in the unit"),
    ("Peeling paint", "Paint flaking off the walls"),
    ("Ceiling filtration", "Water filtering through the ceiling"),
    ("Broken lock", "The door lock is broken"),
    ("Broken window", "Window pane is cracked"),
    ("Burst pipe", "Pipe leaking inside the wall"),
    ("Hallway lighting", "Hallway lights are out"),
];

const LOCATIONS: &[&str] = &["bathroom", "kitchen", "living room", "bedroom", "balcony"];

/// The seeded classifier hierarchy.
///
/// Roots and area nodes exist so hierarchical filtering has something to
/// resolve; tickets are filed under the leaves only.
pub fn classifier_tree() -> Vec<Classifier> {
    let requests = root("service_requests", "Service Requests");
    let residential = child_of(&requests, "residential", "Residential");
    let common = child_of(&requests, "common_areas", "Common Areas");

    let altos_palmas = child_of(&residential, "altos_palmas", "Altos de las Palmas");
    let torre1 = child_of(&altos_palmas, "altos_palmas_torre1", "Altos de las Palmas Torre 1");
    let torre2 = child_of(&altos_palmas, "altos_palmas_torre2", "Altos de las Palmas Torre 2");
    let torre3 = child_of(&altos_palmas, "altos_palmas_torre3", "Altos de las Palmas Torre 3");

    let mirador = child_of(&residential, "mirador_horizonte", "Mirador del Horizonte");
    let senderos = child_of(&residential, "senderos_cerro", "Senderos del Cerro");
    let hungria = child_of(&residential, "hungria_reservado", "Hungria Reservado");
    let zonas = child_of(&common, "zonas_comunes", "Zonas Comunes");

    vec![
        requests, residential, common, altos_palmas, torre1, torre2, torre3, mirador, senderos,
        hungria, zonas,
    ]
}

/// Leaf classifier ids tickets are filed under.
pub fn leaf_classifier_ids() -> Vec<&'static str> {
    vec![
        "altos_palmas_torre1",
        "altos_palmas_torre2",
        "altos_palmas_torre3",
        "mirador_horizonte",
        "senderos_cerro",
        "hungria_reservado",
        "zonas_comunes",
    ]
}

fn pick<'a, T: ?Sized>(rng: &mut impl Rng, pool: &[&'a T]) -> &'a T {
    pool[rng.gen_range(0..pool.len())]
}

fn user_pool(prefix: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("{}_{:03}", prefix, i)).collect()
}

/// Generate one synthetic ticket.
pub fn generate_ticket(rng: &mut impl Rng, seq: usize, base_time: DateTime<Utc>) -> Ticket {
    let leaves = leaf_classifier_ids();
    let users = user_pool("user", 50);
    let agents = user_pool("agent", 10);
    let supervisors = user_pool("supervisor", 3);

    let (title, description_template) = PROBLEMS[rng.gen_range(0..PROBLEMS.len())];
    let description = if description_template.contains("{}") {
        description_template.replacen("{}", pick(rng, LOCATIONS), 1)
    } else {
        description_template.to_string()
    };

    let classifier = pick(rng, &leaves).to_string();
    let reporter = users[rng.gen_range(0..users.len())].clone();

    let created_at = base_time
        - Duration::days(rng.gen_range(0..90))
        - Duration::seconds(rng.gen_range(0..86_400));

    let mut history = vec![Event::Created {
        timestamp: created_at,
        user_id: reporter.clone(),
        details: CreatedDetails {
            initial_state: TicketState::Open,
            initial_classification: classifier.clone(),
        },
    }];

    let mut assigned_to: Option<String> = None;

    // ~70% of tickets get picked up
    if rng.gen::<f64>() > 0.3 {
        let agent = agents[rng.gen_range(0..agents.len())].clone();
        let assigned_at = created_at + Duration::hours(rng.gen_range(1..=24));

        history.push(Event::Assignment {
            timestamp: assigned_at,
            user_id: supervisors[rng.gen_range(0..supervisors.len())].clone(),
            assigned_to: agent.clone(),
        });
        history.push(Event::StateChange {
            timestamp: assigned_at + Duration::minutes(5),
            user_id: agent.clone(),
            from: TicketState::Open,
            to: TicketState::InProgress,
            comment: Some("Under review".into()),
        });
        assigned_to = Some(agent.clone());

        // ~60% of picked-up tickets get resolved
        if rng.gen::<f64>() > 0.4 {
            let closed_at = assigned_at + Duration::days(rng.gen_range(1..=15));

            history.push(Event::Comment {
                timestamp: closed_at - Duration::hours(2),
                user_id: agent.clone(),
                comment: "Work done, waiting for verification".into(),
            });
            history.push(Event::StateChange {
                timestamp: closed_at,
                user_id: agent,
                from: TicketState::InProgress,
                to: TicketState::Closed,
                comment: Some("Issue resolved".into()),
            });

            // ~15% of resolved tickets come back
            if rng.gen::<f64>() > 0.85 {
                let reopened_at = closed_at + Duration::days(rng.gen_range(1..=10));
                history.push(Event::StateChange {
                    timestamp: reopened_at,
                    user_id: reporter.clone(),
                    from: TicketState::Closed,
                    to: TicketState::Open,
                    comment: Some("Problem persists or has come back".into()),
                });

                if rng.gen::<f64>() > 0.5 {
                    let next_agent = agents[rng.gen_range(0..agents.len())].clone();
                    let reassigned_at = reopened_at + Duration::hours(rng.gen_range(2..=12));
                    history.push(Event::Assignment {
                        timestamp: reassigned_at,
                        user_id: supervisors[rng.gen_range(0..supervisors.len())].clone(),
                        assigned_to: next_agent.clone(),
                    });
                    history.push(Event::StateChange {
                        timestamp: reassigned_at + Duration::minutes(10),
                        user_id: next_agent.clone(),
                        from: TicketState::Open,
                        to: TicketState::InProgress,
                        comment: Some("Reopened, investigating root cause".into()),
                    });
                    assigned_to = Some(next_agent);
                }
            }
        }
    }

    let current_state = history::current_state_of(&history);
    let derived = DerivedFields::project(&history, current_state, created_at);

    let mut ticket = Ticket {
        id: format!("ticket_{:04}", seq),
        title: title.to_string(),
        description,
        current_state,
        current_classifications: Classifications {
            request_type: classifier,
        },
        created_at,
        created_by: reporter,
        assigned_to,
        history,
        reopen_count: 0,
        state_change_count: 0,
        comment_count: 0,
        closed_at: None,
        last_state_change_at: None,
        last_modified_at: None,
    };
    ticket.apply_derived(&derived);
    ticket
}

/// Seed the database: drop-then-insert the classifier hierarchy and `count`
/// generated tickets. `on_item` is called per generated ticket with
/// (index, total).
pub fn seed_database<F>(
    db: &Database,
    rng: &mut impl Rng,
    options: &SeedOptions,
    mut on_item: F,
) -> Result<SeedSummary>
where
    F: FnMut(usize, usize),
{
    db.migrate()?;

    let classifiers = classifier_tree();
    db.replace_all_classifiers(&classifiers)?;

    let mut tickets = Vec::with_capacity(options.count);
    for seq in 1..=options.count {
        tickets.push(generate_ticket(rng, seq, options.base_time));
        on_item(seq, options.count);
    }
    db.replace_all_tickets(&tickets)?;

    tracing::info!(
        classifiers = classifiers.len(),
        tickets = tickets.len(),
        "Seeded database"
    );

    Ok(SeedSummary {
        classifiers: classifiers.len(),
        tickets: tickets.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn base() -> DateTime<Utc> {
        "2025-10-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_generated_tickets_honor_invariants() {
        let mut rng = StdRng::seed_from_u64(42);
        for seq in 1..=200 {
            let ticket = generate_ticket(&mut rng, seq, base());

            // First event is always creation.
            assert!(matches!(ticket.history[0], Event::Created { .. }));

            // History is chronological as stored.
            let stamps: Vec<_> = ticket.history.iter().map(Event::timestamp).collect();
            assert!(stamps.windows(2).all(|w| w[0] <= w[1]));

            // Stored state mirrors the last state change.
            assert_eq!(ticket.current_state, history::current_state_of(&ticket.history));

            // Derived fields match a fresh projection.
            let derived = DerivedFields::project(
                &ticket.history,
                ticket.current_state,
                ticket.created_at,
            );
            assert_eq!(ticket.reopen_count, derived.reopen_count);
            assert_eq!(ticket.closed_at, derived.closed_at);
            assert_eq!(ticket.last_modified_at, derived.last_modified_at);

            // closed_at present iff the ticket is currently closed.
            assert_eq!(
                ticket.closed_at.is_some(),
                ticket.current_state == TicketState::Closed
            );
        }
    }

    #[test]
    fn test_seeding_is_deterministic() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let first = generate_ticket(&mut a, 1, base());
        let second = generate_ticket(&mut b, 1, base());
        assert_eq!(first.id, second.id);
        assert_eq!(first.title, second.title);
        assert_eq!(first.history.len(), second.history.len());
        assert_eq!(first.current_state, second.current_state);
    }

    #[test]
    fn test_seed_database_populates_both_collections() {
        let db = Database::open_in_memory().unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let summary = seed_database(
            &db,
            &mut rng,
            &SeedOptions {
                count: 30,
                base_time: base(),
            },
            |_, _| {},
        )
        .unwrap();

        assert_eq!(summary.tickets, 30);
        assert_eq!(db.count_collection("tickets").unwrap(), 30);
        assert_eq!(
            db.count_collection("classifiers").unwrap() as usize,
            summary.classifiers
        );

        // Reseeding replaces rather than appends.
        let mut rng = StdRng::seed_from_u64(4);
        seed_database(
            &db,
            &mut rng,
            &SeedOptions {
                count: 10,
                base_time: base(),
            },
            |_, _| {},
        )
        .unwrap();
        assert_eq!(db.count_collection("tickets").unwrap(), 10);
    }
}
