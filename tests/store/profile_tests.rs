use super::support::*;
use h4ul_store::UserUpdate;

#[tokio::test]
async fn setup_creates_profile_and_wishlist() {
    let store = store();
    let (user, wishlist) = setup_user(&store, "ada").await;

    assert_eq!(user.id, "ada");
    assert_eq!(user.username, "ada");
    assert_eq!(user.follower_count, 0);
    assert_eq!(user.following_count, 0);
    assert!(!user.is_admin);

    assert!(wishlist.is_wishlist);
    assert!(wishlist.is_private);
    assert_eq!(wishlist.name, "My Wishlist");
    assert_eq!(wishlist.user_id, "ada");

    let found = store.collections().wishlist("ada").await.expect("wishlist lookup");
    assert_eq!(found.expect("wishlist exists").id, wishlist.id);
}

#[tokio::test]
async fn repeated_setup_converges_on_one_wishlist() {
    let store = store();
    let (_, wishlist) = setup_user(&store, "ada").await;

    let again = store
        .collections()
        .ensure_wishlist("ada")
        .await
        .expect("ensure wishlist");
    assert_eq!(again.id, wishlist.id);

    let owned = store.collections().list_by_owner("ada").await.expect("list");
    assert_eq!(owned.len(), 1);
}

#[tokio::test]
async fn usernames_are_stored_lowercased() {
    let store = store();
    let user = store
        .profiles()
        .create(
            "u1",
            "grace@example.com",
            UserInput {
                username: "Grace_Hopper".to_string(),
                display_name: "Grace".to_string(),
                ..Default::default()
            },
        )
        .await
        .expect("create");
    assert_eq!(user.username, "grace_hopper");

    let by_name = store
        .profiles()
        .get_by_username("GRACE_hopper")
        .await
        .expect("lookup");
    assert_eq!(by_name.expect("found").id, "u1");
}

#[tokio::test]
async fn availability_is_a_point_lookup() {
    let store = store();
    setup_user(&store, "ada").await;

    assert!(!store.profiles().is_username_available("ada").await.expect("taken"));
    assert!(!store.profiles().is_username_available("ADA").await.expect("case"));
    assert!(store.profiles().is_username_available("adam").await.expect("free"));
}

#[tokio::test]
async fn duplicate_user_id_is_a_conflict() {
    let store = store();
    setup_user(&store, "ada").await;

    let err = store
        .profiles()
        .create(
            "ada",
            "other@example.com",
            UserInput {
                username: "other".to_string(),
                display_name: "Other".to_string(),
                ..Default::default()
            },
        )
        .await
        .expect_err("duplicate id");
    assert!(matches!(err, StoreError::Conflict { .. }));
}

#[tokio::test]
async fn rejects_bad_signup_input() {
    let store = store();
    let err = store
        .profiles()
        .create(
            "u1",
            "not-an-email",
            UserInput {
                username: "a!".to_string(),
                display_name: "  ".to_string(),
                ..Default::default()
            },
        )
        .await
        .expect_err("invalid input");
    let StoreError::Validation(validation) = err else {
        panic!("expected validation error, got {err:?}");
    };
    let fields: Vec<&str> = validation.issues.iter().map(|i| i.field.as_str()).collect();
    assert!(fields.contains(&"username"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"display_name"));
}

#[tokio::test]
async fn update_merges_fields_and_reports_previous() {
    let store = store();
    setup_user(&store, "ada").await;

    let mutation = store
        .profiles()
        .update(
            &store.session("ada"),
            UserUpdate {
                bio: Some("vintage only".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(mutation.record.bio, "vintage only");
    assert_eq!(mutation.previous.bio, "");
    assert_eq!(mutation.record.username, "ada");
}

#[tokio::test]
async fn update_preserves_counters_written_by_the_graph() {
    let store = store();
    setup_user(&store, "ada").await;
    setup_user(&store, "bob").await;
    store
        .graph()
        .follow(&store.session("bob"), "ada")
        .await
        .expect("follow");

    store
        .profiles()
        .update(
            &store.session("ada"),
            UserUpdate {
                bio: Some("new bio".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update");

    let ada = store.profiles().get("ada").await.expect("get").expect("exists");
    assert_eq!(ada.follower_count, 1);
    assert_eq!(ada.bio, "new bio");
}

#[tokio::test]
async fn username_change_remaps_lookup_and_search() {
    let store = store();
    setup_user(&store, "ada").await;

    let mutation = store
        .profiles()
        .update(
            &store.session("ada"),
            UserUpdate {
                username: Some("Countess".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("rename");
    assert_eq!(mutation.record.username, "countess");
    assert_eq!(mutation.previous.username, "ada");

    assert!(
        store
            .profiles()
            .get_by_username("ada")
            .await
            .expect("old lookup")
            .is_none()
    );
    let renamed = store
        .profiles()
        .get_by_username("countess")
        .await
        .expect("new lookup");
    assert_eq!(renamed.expect("found").id, "ada");
}

#[tokio::test]
async fn username_race_lets_the_last_writer_take_the_mapping() {
    let store = store();
    // Both signups saw the name as free; nothing reserves it between the
    // check and the write.
    assert!(store.profiles().is_username_available("ada").await.expect("check"));
    for id in ["u1", "u2"] {
        store
            .profiles()
            .create(
                id,
                &format!("{id}@example.com"),
                UserInput {
                    username: "ada".to_string(),
                    display_name: "Ada".to_string(),
                    ..Default::default()
                },
            )
            .await
            .expect("create");
    }

    let resolved = store
        .profiles()
        .get_by_username("ada")
        .await
        .expect("lookup")
        .expect("mapping survives");
    assert_eq!(resolved.id, "u2");
    // The loser keeps the name on their record; only the mapping moved.
    let loser = store.profiles().get("u1").await.expect("get").expect("exists");
    assert_eq!(loser.username, "ada");
}

#[tokio::test]
async fn empty_update_is_rejected() {
    let store = store();
    setup_user(&store, "ada").await;

    let err = store
        .profiles()
        .update(&store.session("ada"), UserUpdate::default())
        .await
        .expect_err("empty update");
    assert!(matches!(err, StoreError::Validation(_)));
}

#[tokio::test]
async fn search_finds_users_whose_ids_contain_colons() {
    let store = store();
    // Ids come from external auth providers and may carry colons.
    store
        .profiles()
        .create(
            "oauth:42",
            "ada@example.com",
            UserInput {
                username: "ada".to_string(),
                display_name: "Ada".to_string(),
                ..Default::default()
            },
        )
        .await
        .expect("create");

    let hits = store.profiles().search("ad", 10).await.expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "oauth:42");
}

#[tokio::test]
async fn search_matches_username_prefixes() {
    let store = store();
    setup_user(&store, "ada").await;
    setup_user(&store, "adam").await;
    setup_user(&store, "bob").await;

    let hits = store.profiles().search("ad", 10).await.expect("search");
    let usernames: Vec<&str> = hits.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(usernames, ["ada", "adam"]);

    assert!(store.profiles().search("zz", 10).await.expect("miss").is_empty());
    assert!(store.profiles().search("", 10).await.expect("blank").is_empty());
}
