//! Concurrent access tests
//!
//! Many threads share one context, each with its own session. Writes
//! serialize on the repository's connection lock.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

use healthlog_core::config::Config;
use healthlog_core::domain::Argon2Params;
use healthlog_core::ports::Repository;
use healthlog_core::{Error, HealthlogContext, Post, SignupRequest};

const THREAD_COUNT: usize = 6;

const ITERATIONS_PER_THREAD: usize = 5;

fn create_shared_context(temp_dir: &TempDir) -> Arc<HealthlogContext> {
    Config {
        password_hashing: Argon2Params {
            time_cost: 1,
            memory_cost: 1024,
            parallelism: 1,
        },
        ..Config::default()
    }
    .save(temp_dir.path())
    .unwrap();
    Arc::new(HealthlogContext::new(temp_dir.path()).unwrap())
}

fn request(username: &str) -> SignupRequest {
    SignupRequest {
        username: username.to_string(),
        password: "pw".to_string(),
        email: format!("{}@example.com", username),
        first_name: "Thread".to_string(),
        last_name: "User".to_string(),
        image_url: None,
    }
}

/// Every thread commits its own users and posts; nothing is lost
#[test]
fn test_concurrent_sessions_writing() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_shared_context(&temp_dir);
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|t| {
            let ctx = Arc::clone(&ctx);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..ITERATIONS_PER_THREAD {
                    let mut session = ctx.session();
                    ctx.users
                        .signup(&mut session, request(&format!("user_{}_{}", t, i)))
                        .unwrap();
                    let user_id = session.commit().unwrap()[0].as_user().unwrap().id.unwrap();

                    ctx.posts
                        .create(&mut session, Post::new(format!("post {} {}", t, i), "text").by(user_id));
                    session.commit().unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let counts = ctx.repository.counts().unwrap();
    assert_eq!(counts.users as usize, THREAD_COUNT * ITERATIONS_PER_THREAD);
    assert_eq!(counts.posts as usize, THREAD_COUNT * ITERATIONS_PER_THREAD);
    assert_eq!(counts.orphaned_posts, 0);
}

/// Racing signups for one username: exactly one wins
#[test]
fn test_concurrent_duplicate_signup() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_shared_context(&temp_dir);
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let successes = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let barrier = Arc::clone(&barrier);
            let successes = Arc::clone(&successes);
            thread::spawn(move || {
                let mut session = ctx.session();
                ctx.users.signup(&mut session, request("popular")).unwrap();
                barrier.wait();
                match session.commit() {
                    Ok(_) => {
                        successes.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => assert!(matches!(e, Error::UniqueViolation { .. }), "got {:?}", e),
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.repository.counts().unwrap().users, 1);
}
