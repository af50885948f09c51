use axum::http::StatusCode;
use feature_board::db::{Database, SortKey, SortOrder};
use feature_board::error::ApiError;
use feature_board::models::*;
use speculate2::speculate;
use uuid::Uuid;

fn seed_user(db: &Database, name: &str) -> User {
    db.create_user(CreateUserInput {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        photo_url: None,
        role: Role::User,
    })
    .expect("Failed to create user")
}

fn submit(db: &Database, owner: Uuid, title: &str) -> FeatureView {
    db.create_feature(
        owner,
        CreateFeatureInput {
            title: title.to_string(),
            description: format!("{} description", title),
        },
    )
    .expect("Failed to create feature")
}

/// The embedded counters must equal the size of their collections after
/// every mutation.
fn assert_counters(db: &Database, id: Uuid) {
    let feature = db
        .get_feature(id)
        .expect("Query failed")
        .expect("Feature missing");
    assert_eq!(feature.likes.count, feature.likes.users.len() as i64);
    assert_eq!(feature.comments.count, feature.comments.data.len() as i64);
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "create_feature" {
        it "creates a pending feature with empty likes and comments" {
            let owner = seed_user(&db, "Alice");
            let view = submit(&db, owner.id, "Dark mode");

            assert_eq!(view.title, "Dark mode");
            assert_eq!(view.status, FeatureStatus::Pending);
            assert_eq!(view.likes.count, 0);
            assert!(view.likes.users.is_empty());
            assert_eq!(view.comments.count, 0);
            assert!(view.comments.data.is_empty());
            assert_eq!(view.created_by.id, owner.id);
            assert_counters(&db, view.id);
        }

        it "rejects an empty title" {
            let owner = seed_user(&db, "Alice");
            let err = db.create_feature(owner.id, CreateFeatureInput {
                title: "   ".to_string(),
                description: "Something".to_string(),
            }).unwrap_err();

            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }

        it "rejects an empty description" {
            let owner = seed_user(&db, "Alice");
            let err = db.create_feature(owner.id, CreateFeatureInput {
                title: "Dark mode".to_string(),
                description: "".to_string(),
            }).unwrap_err();

            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }

        it "rejects a duplicate title case-insensitively" {
            let owner = seed_user(&db, "Alice");
            submit(&db, owner.id, "Dark Mode");

            let err = db.create_feature(owner.id, CreateFeatureInput {
                title: "dark mode".to_string(),
                description: "Again".to_string(),
            }).unwrap_err();

            assert!(matches!(err, ApiError::DuplicateTitle));
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }

        it "frees the title once the original is soft-deleted" {
            let owner = seed_user(&db, "Alice");
            let first = submit(&db, owner.id, "Dark mode");
            db.soft_delete_feature(first.id).expect("Failed to soft delete");

            let second = db.create_feature(owner.id, CreateFeatureInput {
                title: "dark mode".to_string(),
                description: "Again".to_string(),
            }).expect("Duplicate check should ignore deleted features");

            assert_ne!(second.id, first.id);
        }

        it "does not treat a partial title overlap as a duplicate" {
            let owner = seed_user(&db, "Alice");
            submit(&db, owner.id, "Dark mode");

            let view = db.create_feature(owner.id, CreateFeatureInput {
                title: "Dark mode for the editor".to_string(),
                description: "Longer title".to_string(),
            }).expect("Exact equality must not match substrings");

            assert_eq!(view.title, "Dark mode for the editor");
        }
    }

    describe "update_feature" {
        it "lets the owner edit title and description" {
            let owner = seed_user(&db, "Alice");
            let view = submit(&db, owner.id, "Dark mode");

            let updated = db.update_feature(view.id, owner.id, UpdateFeatureInput {
                title: Some("Dark theme".to_string()),
                description: Some("New text".to_string()),
            }).expect("Owner update should succeed");

            assert_eq!(updated.title, "Dark theme");
            assert_eq!(updated.description, "New text");
        }

        it "leaves omitted fields unchanged" {
            let owner = seed_user(&db, "Alice");
            let view = submit(&db, owner.id, "Dark mode");

            let updated = db.update_feature(view.id, owner.id, UpdateFeatureInput {
                title: Some("Dark theme".to_string()),
                description: None,
            }).expect("Partial update should succeed");

            assert_eq!(updated.title, "Dark theme");
            assert_eq!(updated.description, "Dark mode description");
        }

        it "rejects a non-owner" {
            let owner = seed_user(&db, "Alice");
            let other = seed_user(&db, "Bob");
            let view = submit(&db, owner.id, "Dark mode");

            let err = db.update_feature(view.id, other.id, UpdateFeatureInput {
                title: Some("Hijacked".to_string()),
                description: None,
            }).unwrap_err();

            assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        }

        it "does not touch status or engagement" {
            let owner = seed_user(&db, "Alice");
            let liker = seed_user(&db, "Bob");
            let view = submit(&db, owner.id, "Dark mode");
            db.like_feature(view.id, liker.id).expect("Failed to like");
            db.update_status(view.id, FeatureStatus::Planned).expect("Failed to set status");

            let updated = db.update_feature(view.id, owner.id, UpdateFeatureInput {
                title: Some("Dark theme".to_string()),
                description: None,
            }).expect("Update should succeed");

            assert_eq!(updated.status, FeatureStatus::Planned);
            assert_eq!(updated.likes.count, 1);
        }

        it "returns not found for a missing id" {
            let owner = seed_user(&db, "Alice");
            let err = db.update_feature(Uuid::new_v4(), owner.id, UpdateFeatureInput {
                title: Some("Nope".to_string()),
                description: None,
            }).unwrap_err();

            assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        }
    }

    describe "update_status" {
        it "moves between arbitrary statuses with no transition graph" {
            let owner = seed_user(&db, "Alice");
            let view = submit(&db, owner.id, "Dark mode");

            let v = db.update_status(view.id, FeatureStatus::Complete).expect("Failed");
            assert_eq!(v.status, FeatureStatus::Complete);

            let v = db.update_status(view.id, FeatureStatus::UnderReview).expect("Failed");
            assert_eq!(v.status, FeatureStatus::UnderReview);
        }
    }

    describe "deletion" {
        it "soft delete hides the feature from listings but keeps the record" {
            let owner = seed_user(&db, "Alice");
            let view = submit(&db, owner.id, "Dark mode");

            db.soft_delete_feature(view.id).expect("Failed to soft delete");

            let page = db.list_features(1, 10, None, None, SortOrder::Desc).expect("Failed");
            assert!(page.items.is_empty());

            let raw = db.get_feature(view.id).expect("Query failed").expect("Record retained");
            assert!(raw.is_deleted);

            // Direct-by-id access still resolves the full projection
            let fetched = db.get_feature_view(view.id).expect("Detail fetch ignores the flag");
            assert_eq!(fetched.id, view.id);
        }

        it "hard delete removes the row for the owner" {
            let owner = seed_user(&db, "Alice");
            let view = submit(&db, owner.id, "Dark mode");

            db.hard_delete_feature(view.id, owner.id).expect("Owner delete should succeed");
            assert!(db.get_feature(view.id).expect("Query failed").is_none());
        }

        it "hard delete rejects a non-owner" {
            let owner = seed_user(&db, "Alice");
            let other = seed_user(&db, "Bob");
            let view = submit(&db, owner.id, "Dark mode");

            let err = db.hard_delete_feature(view.id, other.id).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
            assert!(db.get_feature(view.id).expect("Query failed").is_some());
        }
    }

    describe "likes" {
        it "like adds the user and bumps the count" {
            let owner = seed_user(&db, "Alice");
            let liker = seed_user(&db, "Bob");
            let view = submit(&db, owner.id, "Dark mode");

            let v = db.like_feature(view.id, liker.id).expect("Failed to like");
            assert_eq!(v.likes.count, 1);
            assert_eq!(v.likes.users[0].id, liker.id);
            assert_counters(&db, view.id);
        }

        it "a second like from the same user is a no-op" {
            let owner = seed_user(&db, "Alice");
            let liker = seed_user(&db, "Bob");
            let view = submit(&db, owner.id, "Dark mode");

            db.like_feature(view.id, liker.id).expect("Failed to like");
            let v = db.like_feature(view.id, liker.id).expect("Second like should not fail");

            assert_eq!(v.likes.count, 1);
            assert_counters(&db, view.id);
        }

        it "unlike removes the user" {
            let owner = seed_user(&db, "Alice");
            let liker = seed_user(&db, "Bob");
            let view = submit(&db, owner.id, "Dark mode");

            db.like_feature(view.id, liker.id).expect("Failed to like");
            let v = db.unlike_feature(view.id, liker.id).expect("Failed to unlike");

            assert_eq!(v.likes.count, 0);
            assert!(v.likes.users.is_empty());
            assert_counters(&db, view.id);
        }

        it "unlike when not liked leaves state unchanged" {
            let owner = seed_user(&db, "Alice");
            let liker = seed_user(&db, "Bob");
            let view = submit(&db, owner.id, "Dark mode");

            let v = db.unlike_feature(view.id, liker.id).expect("Should be a no-op");
            assert_eq!(v.likes.count, 0);
            assert_counters(&db, view.id);
        }

        it "returns not found for a missing feature" {
            let liker = seed_user(&db, "Bob");
            let err = db.like_feature(Uuid::new_v4(), liker.id).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        }
    }

    describe "comments" {
        it "add appends an entry and bumps the count" {
            let owner = seed_user(&db, "Alice");
            let author = seed_user(&db, "Bob");
            let view = submit(&db, owner.id, "Dark mode");

            let v = db.add_comment(view.id, author.id, "Please!".to_string()).expect("Failed");
            assert_eq!(v.comments.count, 1);
            assert_eq!(v.comments.data[0].comment, "Please!");
            assert_eq!(v.comments.data[0].comments_by.as_ref().expect("Author expanded").id, author.id);
            assert_counters(&db, view.id);
        }

        it "edit replaces the text and moves the entry to the end" {
            let owner = seed_user(&db, "Alice");
            let author = seed_user(&db, "Bob");
            let view = submit(&db, owner.id, "Dark mode");

            let v = db.add_comment(view.id, author.id, "First".to_string()).expect("Failed");
            let first_id = v.comments.data[0].id;
            let first_created = v.comments.data[0].created_at;
            db.add_comment(view.id, author.id, "Second".to_string()).expect("Failed");

            let v = db.edit_comment(view.id, first_id, "First, edited".to_string()).expect("Failed");

            assert_eq!(v.comments.count, 2);
            let last = v.comments.data.last().expect("Edited entry present");
            assert_eq!(last.id, first_id);
            assert_eq!(last.comment, "First, edited");
            assert!(last.created_at >= first_created);
            // The untouched comment now sits first
            assert_eq!(v.comments.data[0].comment, "Second");
            assert_counters(&db, view.id);
        }

        it "edit keeps the original author" {
            let owner = seed_user(&db, "Alice");
            let author = seed_user(&db, "Bob");
            let view = submit(&db, owner.id, "Dark mode");

            let v = db.add_comment(view.id, author.id, "Mine".to_string()).expect("Failed");
            let comment_id = v.comments.data[0].id;

            let v = db.edit_comment(view.id, comment_id, "Rewritten".to_string()).expect("Failed");
            assert_eq!(v.comments.data[0].comments_by.as_ref().expect("Author expanded").id, author.id);
        }

        it "edit returns not found for a missing comment" {
            let owner = seed_user(&db, "Alice");
            let view = submit(&db, owner.id, "Dark mode");

            let err = db.edit_comment(view.id, Uuid::new_v4(), "Nope".to_string()).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        }

        it "delete rejects a caller who is not the author" {
            let owner = seed_user(&db, "Alice");
            let author = seed_user(&db, "Bob");
            let other = seed_user(&db, "Carol");
            let view = submit(&db, owner.id, "Dark mode");

            let v = db.add_comment(view.id, author.id, "Mine".to_string()).expect("Failed");
            let comment_id = v.comments.data[0].id;

            let err = db.delete_comment(view.id, comment_id, other.id).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
            assert_counters(&db, view.id);
        }

        it "delete by the author removes exactly one entry" {
            let owner = seed_user(&db, "Alice");
            let author = seed_user(&db, "Bob");
            let view = submit(&db, owner.id, "Dark mode");

            db.add_comment(view.id, author.id, "One".to_string()).expect("Failed");
            let v = db.add_comment(view.id, author.id, "Two".to_string()).expect("Failed");
            let second_id = v.comments.data[1].id;

            let v = db.delete_comment(view.id, second_id, author.id).expect("Author delete");
            assert_eq!(v.comments.count, 1);
            assert_eq!(v.comments.data[0].comment, "One");
            assert_counters(&db, view.id);
        }
    }

    describe "list_features" {
        it "paginates with 1-indexed pages" {
            let owner = seed_user(&db, "Alice");
            for i in 1..=12 {
                submit(&db, owner.id, &format!("Feature {:02}", i));
            }

            let page = db.list_features(1, 5, None, None, SortOrder::Desc).expect("Failed");
            assert_eq!(page.items.len(), 5);
            assert_eq!(page.page_info.total, 12);
            assert_eq!(page.page_info.total_pages, 3);
            assert!(page.page_info.has_more_next);
            assert!(!page.page_info.has_more_prev);

            let page = db.list_features(3, 5, None, None, SortOrder::Desc).expect("Failed");
            assert_eq!(page.items.len(), 2);
            assert!(!page.page_info.has_more_next);
            assert!(page.page_info.has_more_prev);
        }

        it "returns newest first by default" {
            let owner = seed_user(&db, "Alice");
            submit(&db, owner.id, "Oldest");
            submit(&db, owner.id, "Middle");
            submit(&db, owner.id, "Newest");

            let page = db.list_features(1, 10, None, None, SortOrder::Desc).expect("Failed");
            assert_eq!(page.items[0].title, "Newest");
            assert_eq!(page.items[2].title, "Oldest");
        }

        it "filters by status and reports matching counts" {
            let owner = seed_user(&db, "Alice");
            let a = submit(&db, owner.id, "One");
            submit(&db, owner.id, "Two");
            submit(&db, owner.id, "Three");
            db.update_status(a.id, FeatureStatus::Planned).expect("Failed");

            let page = db.list_features(1, 10, Some(FeatureStatus::Planned), None, SortOrder::Desc)
                .expect("Failed");
            assert_eq!(page.items.len(), 1);
            assert_eq!(page.items[0].title, "One");
            assert_eq!(page.page_info.total, 1);
            assert_eq!(page.status_counts.get("planned"), Some(&1));
            assert_eq!(page.status_counts.get("pending"), None);
        }

        it "aggregates status counts over the unfiltered population" {
            let owner = seed_user(&db, "Alice");
            let a = submit(&db, owner.id, "One");
            submit(&db, owner.id, "Two");
            submit(&db, owner.id, "Three");
            db.update_status(a.id, FeatureStatus::InProgress).expect("Failed");

            let page = db.list_features(1, 10, None, None, SortOrder::Desc).expect("Failed");
            assert_eq!(page.status_counts.get("pending"), Some(&2));
            assert_eq!(page.status_counts.get("in-progress"), Some(&1));
        }

        it "sorts by like count" {
            let owner = seed_user(&db, "Alice");
            let u1 = seed_user(&db, "Bob");
            let u2 = seed_user(&db, "Carol");
            submit(&db, owner.id, "Quiet");
            let popular = submit(&db, owner.id, "Popular");
            let middling = submit(&db, owner.id, "Middling");
            db.like_feature(popular.id, u1.id).expect("Failed");
            db.like_feature(popular.id, u2.id).expect("Failed");
            db.like_feature(middling.id, u1.id).expect("Failed");

            let page = db.list_features(1, 10, None, Some(SortKey::LikesCount), SortOrder::Desc)
                .expect("Failed");
            assert_eq!(page.items[0].title, "Popular");
            assert_eq!(page.items[1].title, "Middling");
            assert_eq!(page.items[2].title, "Quiet");
        }

        it "sorts titles case-insensitively" {
            let owner = seed_user(&db, "Alice");
            submit(&db, owner.id, "banana");
            submit(&db, owner.id, "Apple");
            submit(&db, owner.id, "cherry");

            let page = db.list_features(1, 10, None, Some(SortKey::Title), SortOrder::Asc)
                .expect("Failed");
            let titles: Vec<_> = page.items.iter().map(|i| i.title.as_str()).collect();
            assert_eq!(titles, vec!["Apple", "banana", "cherry"]);
        }

        it "drops items whose owner no longer resolves, after the page is cut" {
            let owner = seed_user(&db, "Alice");
            let ghost = seed_user(&db, "Bob");
            submit(&db, owner.id, "Kept");
            submit(&db, ghost.id, "Orphaned");
            db.soft_delete_user(ghost.id).expect("Failed to delete user");

            let page = db.list_features(1, 10, None, None, SortOrder::Desc).expect("Failed");
            assert_eq!(page.items.len(), 1);
            assert_eq!(page.items[0].title, "Kept");
            // The database-level total still counts the orphaned row
            assert_eq!(page.page_info.total, 2);
        }

        it "trims comment bodies to a count" {
            let owner = seed_user(&db, "Alice");
            let view = submit(&db, owner.id, "Dark mode");
            db.add_comment(view.id, owner.id, "Body".to_string()).expect("Failed");

            let page = db.list_features(1, 10, None, None, SortOrder::Desc).expect("Failed");
            assert_eq!(page.items[0].total_comments, 1);
        }
    }

    describe "search_features" {
        it "matches title or description case-insensitively" {
            let owner = seed_user(&db, "Alice");
            submit(&db, owner.id, "Dark mode");
            db.create_feature(owner.id, CreateFeatureInput {
                title: "Exports".to_string(),
                description: "Support DARK csv exports".to_string(),
            }).expect("Failed");
            submit(&db, owner.id, "Unrelated");

            let page = db.search_features("dark", 1, 10).expect("Failed");
            assert_eq!(page.items.len(), 2);
            assert_eq!(page.page_info.total, 2);
        }

        it "excludes soft-deleted features" {
            let owner = seed_user(&db, "Alice");
            let view = submit(&db, owner.id, "Dark mode");
            db.soft_delete_feature(view.id).expect("Failed");

            let page = db.search_features("dark", 1, 10).expect("Failed");
            assert!(page.items.is_empty());
        }

        it "returns full projections including comment bodies" {
            let owner = seed_user(&db, "Alice");
            let view = submit(&db, owner.id, "Dark mode");
            db.add_comment(view.id, owner.id, "Visible".to_string()).expect("Failed");

            let page = db.search_features("dark", 1, 10).expect("Failed");
            assert_eq!(page.items[0].comments.data[0].comment, "Visible");
        }

        it "paginates like the listing" {
            let owner = seed_user(&db, "Alice");
            for i in 1..=7 {
                submit(&db, owner.id, &format!("Theme option {}", i));
            }

            let page = db.search_features("theme", 2, 5).expect("Failed");
            assert_eq!(page.items.len(), 2);
            assert!(page.page_info.has_more_prev);
            assert!(!page.page_info.has_more_next);
        }

        it "treats LIKE wildcards as literals" {
            let owner = seed_user(&db, "Alice");
            submit(&db, owner.id, "100% coverage");
            submit(&db, owner.id, "Some other idea");

            let page = db.search_features("100%", 1, 10).expect("Failed");
            assert_eq!(page.items.len(), 1);
            assert_eq!(page.items[0].title, "100% coverage");
        }
    }

    describe "open" {
        it "creates parent directories for a file-backed database" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("nested").join("board.db");

            let db = Database::open(path).expect("Failed to open");
            db.migrate().expect("Failed to migrate");

            let user = seed_user(&db, "Alice");
            assert!(db.get_user(user.id).expect("Query failed").is_some());
        }
    }
}
