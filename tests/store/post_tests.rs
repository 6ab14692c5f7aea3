use super::support::*;
use h4ul_store::{PostUpdate, limits};

#[tokio::test]
async fn create_normalizes_tags_and_defaults() {
    let store = store();
    setup_user(&store, "ada").await;

    let post = make_post(
        &store,
        "ada",
        PostInput {
            tags: Some(vec![
                "Vintage".to_string(),
                " denim ".to_string(),
                "vintage".to_string(),
            ]),
            ..post_input("first fit")
        },
    )
    .await;

    assert_eq!(post.user_id, "ada");
    assert_eq!(post.caption, "first fit");
    assert_eq!(post.tags, ["vintage", "denim"]);
    assert!(!post.is_private);
    assert_eq!(post.like_count, 0);
    assert!(post.collection_ids.is_empty());
}

#[tokio::test]
async fn create_rejects_oversized_input() {
    let store = store();
    setup_user(&store, "ada").await;

    let err = store
        .posts()
        .create(
            &store.session("ada"),
            PostInput {
                image_url: "not a url".to_string(),
                caption: Some("x".repeat(limits::CAPTION_MAX_LENGTH + 1)),
                tags: Some((0..limits::MAX_TAGS_PER_POST + 1).map(|i| format!("tag{i}")).collect()),
                ..Default::default()
            },
        )
        .await
        .expect_err("invalid post");
    let StoreError::Validation(validation) = err else {
        panic!("expected validation error, got {err:?}");
    };
    let fields: Vec<&str> = validation.issues.iter().map(|i| i.field.as_str()).collect();
    assert!(fields.contains(&"image_url"));
    assert!(fields.contains(&"caption"));
    assert!(fields.contains(&"tags"));
}

#[tokio::test]
async fn create_files_into_owned_collections() {
    let store = store();
    setup_user(&store, "ada").await;
    let collection = make_collection(&store, "ada", "Summer").await;

    let post = make_post(
        &store,
        "ada",
        PostInput {
            collection_ids: Some(vec![collection.id.clone(), collection.id.clone()]),
            ..post_input("linen shirt")
        },
    )
    .await;

    assert_eq!(post.collection_ids, [collection.id.clone()]);
    assert!(
        store
            .collections()
            .contains(&collection.id, &post.id)
            .await
            .expect("membership")
    );
}

#[tokio::test]
async fn create_rejects_foreign_or_missing_collections() {
    let store = store();
    setup_user(&store, "ada").await;
    setup_user(&store, "bob").await;
    let bobs = make_collection(&store, "bob", "Bob's").await;

    let err = store
        .posts()
        .create(
            &store.session("ada"),
            PostInput {
                collection_ids: Some(vec![bobs.id.clone()]),
                ..post_input("stolen shelf")
            },
        )
        .await
        .expect_err("foreign collection");
    assert!(matches!(err, StoreError::Forbidden { .. }));

    let err = store
        .posts()
        .create(
            &store.session("ada"),
            PostInput {
                collection_ids: Some(vec!["ghost".to_string()]),
                ..post_input("missing shelf")
            },
        )
        .await
        .expect_err("missing collection");
    assert!(matches!(err, StoreError::NotFound { entity: "collection", .. }));
}

#[tokio::test]
async fn owner_listing_includes_private_posts() {
    let store = store();
    setup_user(&store, "ada").await;
    make_post(&store, "ada", post_input("public one")).await;
    tick().await;
    make_post(
        &store,
        "ada",
        PostInput {
            is_private: Some(true),
            ..post_input("private one")
        },
    )
    .await;

    let owned = store
        .posts()
        .list_by_owner("ada", None, 10)
        .await
        .expect("owner listing");
    assert_eq!(owned.items.len(), 2);
    assert_eq!(owned.items[0].caption, "private one");

    let public = store.posts().list_public(None, None, 10).await.expect("public");
    assert_eq!(public.items.len(), 1);
    assert_eq!(public.items[0].caption, "public one");
}

#[tokio::test]
async fn tag_listing_filters_to_one_tag() {
    let store = store();
    setup_user(&store, "ada").await;
    make_post(
        &store,
        "ada",
        PostInput {
            tags: Some(vec!["denim".to_string()]),
            ..post_input("jeans")
        },
    )
    .await;
    tick().await;
    make_post(
        &store,
        "ada",
        PostInput {
            tags: Some(vec!["silk".to_string()]),
            ..post_input("scarf")
        },
    )
    .await;

    let page = store
        .posts()
        .list_public(Some("Denim"), None, 10)
        .await
        .expect("tag listing");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].caption, "jeans");
}

#[tokio::test]
async fn pagination_walks_the_whole_listing() {
    let store = store();
    setup_user(&store, "ada").await;
    for i in 0..5 {
        make_post(&store, "ada", post_input(&format!("fit {i}"))).await;
        tick().await;
    }

    let mut captions = Vec::new();
    let mut cursor = None;
    loop {
        let page = store
            .posts()
            .list_by_owner("ada", cursor.as_ref(), 2)
            .await
            .expect("page");
        assert!(page.items.len() <= 2);
        captions.extend(page.items.iter().map(|p| p.caption.clone()));
        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    assert_eq!(captions, ["fit 4", "fit 3", "fit 2", "fit 1", "fit 0"]);
}

#[tokio::test]
async fn zero_page_size_is_rejected() {
    let store = store();
    setup_user(&store, "ada").await;

    let err = store
        .posts()
        .list_by_owner("ada", None, 0)
        .await
        .expect_err("zero page");
    assert!(matches!(err, StoreError::InvalidRequest { .. }));
}

#[tokio::test]
async fn privacy_toggle_rehomes_the_listings() {
    let store = store();
    setup_user(&store, "ada").await;
    let post = make_post(
        &store,
        "ada",
        PostInput {
            tags: Some(vec!["denim".to_string()]),
            ..post_input("older post")
        },
    )
    .await;
    tick().await;
    make_post(&store, "ada", post_input("newer post")).await;
    let session = store.session("ada");

    store
        .posts()
        .update(
            &session,
            &post.id,
            PostUpdate {
                is_private: Some(true),
                ..Default::default()
            },
        )
        .await
        .expect("hide");
    let public = store.posts().list_public(None, None, 10).await.expect("public");
    assert_eq!(public.items.len(), 1);
    assert_eq!(public.items[0].caption, "newer post");
    assert!(
        store
            .posts()
            .list_public(Some("denim"), None, 10)
            .await
            .expect("tag")
            .items
            .is_empty()
    );

    // Re-publishing keeps the original creation-time position.
    store
        .posts()
        .update(
            &session,
            &post.id,
            PostUpdate {
                is_private: Some(false),
                ..Default::default()
            },
        )
        .await
        .expect("show");
    let public = store.posts().list_public(None, None, 10).await.expect("public");
    let captions: Vec<&str> = public.items.iter().map(|p| p.caption.as_str()).collect();
    assert_eq!(captions, ["newer post", "older post"]);
}

#[tokio::test]
async fn tag_edit_moves_tag_memberships() {
    let store = store();
    setup_user(&store, "ada").await;
    let post = make_post(
        &store,
        "ada",
        PostInput {
            tags: Some(vec!["denim".to_string()]),
            ..post_input("jeans")
        },
    )
    .await;

    let mutation = store
        .posts()
        .update(
            &store.session("ada"),
            &post.id,
            PostUpdate {
                tags: Some(vec!["vintage".to_string()]),
                ..Default::default()
            },
        )
        .await
        .expect("retag");
    assert_eq!(mutation.previous.tags, ["denim"]);
    assert_eq!(mutation.record.tags, ["vintage"]);

    assert!(
        store
            .posts()
            .list_public(Some("denim"), None, 10)
            .await
            .expect("old tag")
            .items
            .is_empty()
    );
    assert_eq!(
        store
            .posts()
            .list_public(Some("vintage"), None, 10)
            .await
            .expect("new tag")
            .items
            .len(),
        1
    );
}

#[tokio::test]
async fn only_the_owner_may_edit_or_delete() {
    let store = store();
    setup_user(&store, "ada").await;
    setup_user(&store, "bob").await;
    let post = make_post(&store, "ada", post_input("mine")).await;

    let err = store
        .posts()
        .update(
            &store.session("bob"),
            &post.id,
            PostUpdate {
                caption: Some("hijacked".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect_err("foreign edit");
    assert!(matches!(err, StoreError::Forbidden { .. }));

    let err = store
        .posts()
        .delete(&store.session("bob"), &post.id)
        .await
        .expect_err("foreign delete");
    assert!(matches!(err, StoreError::Forbidden { .. }));
}

#[tokio::test]
async fn delete_clears_listings_and_leaves_collections_lazy() {
    let store = store();
    setup_user(&store, "ada").await;
    setup_user(&store, "bob").await;
    let collection = make_collection(&store, "ada", "Keepers").await;
    let post = make_post(
        &store,
        "ada",
        PostInput {
            tags: Some(vec!["denim".to_string()]),
            collection_ids: Some(vec![collection.id.clone()]),
            ..post_input("doomed")
        },
    )
    .await;
    store
        .engagement()
        .like(&store.session("bob"), &post.id)
        .await
        .expect("like");

    let deleted = store
        .posts()
        .delete(&store.session("ada"), &post.id)
        .await
        .expect("delete");
    assert_eq!(deleted.id, post.id);

    assert!(store.posts().get(&post.id).await.expect("get").is_none());
    assert!(
        store
            .posts()
            .list_by_owner("ada", None, 10)
            .await
            .expect("owner")
            .items
            .is_empty()
    );
    assert!(
        store
            .posts()
            .list_public(Some("denim"), None, 10)
            .await
            .expect("tag")
            .items
            .is_empty()
    );

    // The membership id dangles; reads drop it silently.
    let shelved = store.collections().posts(&collection.id).await.expect("shelf");
    assert!(shelved.is_empty());
    let hydrated = store
        .collections()
        .get(&collection.id)
        .await
        .expect("get")
        .expect("collection");
    assert_eq!(hydrated.post_ids, [post.id.clone()]);
}
