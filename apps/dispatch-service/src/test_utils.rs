//! テスト用ユーティリティ

mod dispatch_fixture;

pub use dispatch_fixture::DispatchFixture;
