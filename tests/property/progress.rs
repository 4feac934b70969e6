use proptest::prelude::*;
use renderq::exec::progress::extract;

proptest! {
    // Whatever the input, a reported percentage is a valid one.
    #[test]
    fn extracted_percentage_is_bounded(line in ".{0,80}") {
        if let Some(pct) = extract(&line) {
            prop_assert!(pct <= 100);
        }
    }

    #[test]
    fn percent_sign_is_recognised(pct in 0u8..=100, prefix in "[a-z ]{0,10}", suffix in "[a-z ]{0,10}") {
        let line = format!("{prefix} {pct}% {suffix}");
        prop_assert_eq!(extract(&line), Some(pct));
    }

    #[test]
    fn fraction_rounds_to_nearest(done in 0u32..10_000, extra in 0u32..10_000) {
        let total = done + extra + 1;
        let line = format!("frame {done}/{total}");
        let expected = ((u64::from(done) * 200 + u64::from(total)) / (2 * u64::from(total))) as u8;
        prop_assert_eq!(extract(&line), Some(expected));
    }

    #[test]
    fn lines_without_digits_have_no_progress(line in "[a-zA-Z :=/%]{0,60}") {
        prop_assert_eq!(extract(&line), None);
    }
}
