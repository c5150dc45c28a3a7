//! プロセス単位の実行 ID とバッチ ID
//!
//! 起動時に1つ ULID を割り当て、ログとバッチレポートに載せて
//! どのプロセスが結果を出したかを追えるようにする。

use once_cell::sync::Lazy;
use ulid::Ulid;

static RUN_ID: Lazy<String> = Lazy::new(|| Ulid::new().to_string());

/// プロセスの実行 ID（初回アクセス時に生成、以後不変）
#[inline]
pub fn get() -> &'static str {
    &RUN_ID
}

/// 新しい ULID（バッチ ID・リクエスト ID 用）。時刻順にソートできる。
#[inline]
pub fn generate() -> String {
    Ulid::new().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_is_stable_for_the_process() {
        assert_eq!(get(), get());
        assert_eq!(get().len(), 26);
    }

    #[test]
    fn generated_ids_are_unique_and_time_ordered() {
        let older = generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let newer = generate();
        assert_ne!(older, newer);
        assert!(older < newer);
    }
}
