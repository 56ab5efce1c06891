//! Engagement XP flow across the wired application context: comments and
//! likes accrue XP, the ledger drives levels, and the notification bus
//! fans events out to subscribers.

use std::sync::{Arc, Mutex};

use fake::faker::internet::en::SafeEmail;
use fake::Fake;

use ndreqe_core::features::comments::PostCommentDto;
use ndreqe_core::features::issues::dtos::ReportIssueDto;
use ndreqe_core::features::issues::models::IssueCategory;
use ndreqe_core::features::session::dtos::RegisterDto;
use ndreqe_core::features::session::models::Role;
use ndreqe_core::App;

fn register(name: &str, role: Role) -> RegisterDto {
    RegisterDto {
        display_name: name.to_string(),
        email: SafeEmail().fake(),
        password: "correct-horse-battery".to_string(),
        password_confirm: "correct-horse-battery".to_string(),
        role,
    }
}

#[tokio::test]
async fn engagement_accrues_xp_and_levels() -> anyhow::Result<()> {
    let app = App::in_memory();

    let level_ups = Arc::new(Mutex::new(Vec::new()));
    let sink = level_ups.clone();
    let level_sub = app
        .bus
        .on_level_up(move |event| sink.lock().unwrap().push(event.level));

    let xp_changes = Arc::new(Mutex::new(Vec::new()));
    let sink = xp_changes.clone();
    let xp_sub = app
        .bus
        .on_xp_change(move |event| sink.lock().unwrap().push(event.xp));

    let jane = app.session.register(register("Jane", Role::Citizen)).await?;
    let issue = app
        .issues
        .report(
            ReportIssueDto {
                category: IssueCategory::Traffic,
                description: "Broken traffic light".to_string(),
                latitude: 42.66,
                longitude: 21.17,
                image: None,
            },
            &jane,
        )
        .await?;

    // Four comments: 4 x 10 XP, still level 1
    for n in 0..4 {
        app.comments
            .post(
                PostCommentDto {
                    issue_id: issue.id,
                    content: format!("Update {}", n),
                },
                &jane,
            )
            .await?;
    }
    assert_eq!(app.session.current().unwrap().xp, 40);
    assert!(level_ups.lock().unwrap().is_empty());

    // Like then unlike: +5 once, unlike awards nothing
    app.likes.toggle(issue.id, &jane).await?;
    app.likes.toggle(issue.id, &jane).await?;
    assert_eq!(app.session.current().unwrap().xp, 45);

    // One more comment crosses the 50 XP boundary into level 2
    app.comments
        .post(
            PostCommentDto {
                issue_id: issue.id,
                content: "Crossing over".to_string(),
            },
            &jane,
        )
        .await?;

    let current = app.session.current().unwrap();
    assert_eq!(current.xp, 55);
    assert_eq!(current.level, 2);
    assert_eq!(*level_ups.lock().unwrap(), vec![2]);

    // Every award signalled an xp-change: 5 comments + 1 like
    assert_eq!(
        *xp_changes.lock().unwrap(),
        vec![10, 20, 30, 40, 45, 55]
    );

    level_sub.unsubscribe();
    xp_sub.unsubscribe();
    app.session.award_xp(jane.id, 100).await?;
    assert_eq!(*level_ups.lock().unwrap(), vec![2]);

    Ok(())
}

#[tokio::test]
async fn xp_survives_session_restore() -> anyhow::Result<()> {
    let app = App::in_memory();
    let jane = app.session.register(register("Jane", Role::Citizen)).await?;
    app.session.award_xp(jane.id, 120).await?;

    // The stored identity is authoritative on restore
    let restored = app.session.restore().await?.unwrap();
    assert_eq!(restored.xp, 120);
    assert_eq!(restored.level, 3);

    Ok(())
}
