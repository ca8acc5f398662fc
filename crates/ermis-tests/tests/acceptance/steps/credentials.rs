//! Kerberos identity and ticket save/restore steps.

use super::parse_arg;
use crate::world::ErmisWorld;
use cucumber::{given, then, when};
use ermis_tests::credentials::{
    has_ticket_cache, kdestroy, login_as, remember_ticket_cache, remembered_ticket_cache,
    ticket_cache_path, Egroup,
};

#[given(regex = r#"^that we have a valid kerberos ticket of a user in "([^"]*)" egroup$"#)]
async fn valid_ticket_in_egroup(world: &mut ErmisWorld, egroup: String) {
    let egroup: Egroup = parse_arg(&egroup);

    login_as(world.config(), egroup)
        .await
        .unwrap_or_else(|e| panic!("kinit as {} failed: {}", egroup.principal(), e));
}

#[given("that we have no kerberos ticket")]
async fn no_ticket(_world: &mut ErmisWorld) {
    kdestroy()
        .await
        .unwrap_or_else(|e| panic!("kdestroy failed: {}", e));
}

#[given("that we have a kerberos token")]
async fn have_ticket(world: &mut ErmisWorld) {
    let cache = ticket_cache_path()
        .await
        .unwrap_or_else(|e| panic!("no Kerberos ticket to work with: {}", e));

    remember_ticket_cache(&cache);
    world.ticket_cache = Some(cache);
}

#[when("we save the token")]
async fn save_ticket(world: &mut ErmisWorld) {
    let cache = world
        .ticket_cache
        .clone()
        .expect("no ticket cache discovered in this scenario");

    world
        .stash
        .save(&cache)
        .await
        .unwrap_or_else(|e| panic!("saving {} failed: {}", cache.display(), e));
}

#[then("token is saved")]
async fn ticket_is_saved(world: &mut ErmisWorld) {
    assert!(
        world.stash.exists().await,
        "saved ticket {} is missing",
        world.stash.path().display()
    );
}

#[given("that we have the saved kerberos token")]
async fn have_saved_ticket(world: &mut ErmisWorld) {
    assert!(
        world.stash.exists().await,
        "no saved ticket at {}",
        world.stash.path().display()
    );
}

#[when("we restore the token")]
async fn restore_ticket(world: &mut ErmisWorld) {
    let cache = world
        .ticket_cache
        .clone()
        .or_else(remembered_ticket_cache)
        .expect("the ticket cache path was never discovered");

    world
        .stash
        .restore(&cache)
        .await
        .unwrap_or_else(|e| panic!("restoring {} failed: {}", cache.display(), e));

    world.ticket_cache = Some(cache);
}

#[then("we have a valid token")]
async fn ticket_is_valid(world: &mut ErmisWorld) {
    let cache = world
        .ticket_cache
        .clone()
        .or_else(remembered_ticket_cache)
        .expect("the ticket cache path was never discovered");

    assert!(
        has_ticket_cache(&cache).await,
        "ticket cache {} is missing",
        cache.display()
    );
}
