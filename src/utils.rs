use anyhow::{anyhow, Result};
use rust_decimal::{
    prelude::{FromPrimitive, ToPrimitive},
    Decimal,
};

pub fn round_to_9_places(v: f64) -> f64 {
    (v * 1_000_000_000.0).round() / 1_000_000_000.0
}

pub fn wei_to_gwei(wei: u128) -> Result<f64> {
    // Convert u128 to Decimal for precision
    let wei_decimal =
        Decimal::from_u128(wei).ok_or(anyhow!("Wei value {} exceeds decimal range", wei))?;

    // 1 Gwei = 10^9 Wei
    let gwei_conversion_factor = Decimal::new(1_000_000_000, 0);

    let gwei_decimal = wei_decimal / gwei_conversion_factor;

    gwei_decimal
        .round_dp(9)
        .to_f64()
        .ok_or(anyhow!("Failed to convert wei to gwei"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wei_to_gwei() {
        assert_eq!(wei_to_gwei(20_000_000_000).unwrap(), 20.0);
        assert_eq!(wei_to_gwei(1).unwrap(), 0.000000001);
        assert_eq!(wei_to_gwei(0).unwrap(), 0.0);
    }

    #[test]
    fn test_round_to_9_places() {
        assert_eq!(round_to_9_places(1.0000000004), 1.0);
        assert_eq!(round_to_9_places(2.5), 2.5);
    }
}
