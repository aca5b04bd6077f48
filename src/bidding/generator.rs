/// 가상 판매자 입찰 생성기
/// 판매자마다 정확히 하나의 입찰을 만든다. 가격은 항상 판매자 등록가보다 낮다.
// region:    --- Imports
use crate::bidding::model::Bid;
use crate::catalog::model::Seller;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
// endregion: --- Imports

/// 할인 폭 [100, 600)
pub const MIN_DISCOUNT: i64 = 100;
pub const MAX_DISCOUNT: i64 = 600;

/// 제출 시각은 현재로부터 최대 1시간 전
const MAX_SUBMIT_OFFSET_MS: i64 = 3_600_000;

pub const FREEBIES: [&str; 6] = [
    "Free Extended Warranty",
    "Free Shipping",
    "Free Installation",
    "Extra Accessories",
    "Gift Voucher",
    "Cashback Offer",
];

pub const MESSAGES: [&str; 5] = [
    "Best price in your area! Same-day delivery available.",
    "Premium quality guaranteed. Free installation included.",
    "Special discount for you! Limited time offer.",
    "Fastest delivery in the neighborhood!",
    "Extra freebies with this deal. Don't miss out!",
];

// region:    --- Generator
pub struct BidGenerator<'a, R: Rng> {
    rng: &'a mut R,
    now: DateTime<Utc>,
}

impl<'a, R: Rng> BidGenerator<'a, R> {
    pub fn new(rng: &'a mut R, now: DateTime<Utc>) -> Self {
        Self { rng, now }
    }

    /// 판매자 순서대로 입찰 생성
    pub fn generate_all(&mut self, sellers: &[Seller]) -> Vec<Bid> {
        sellers
            .iter()
            .enumerate()
            .map(|(index, seller)| self.generate(index, seller))
            .collect()
    }

    pub fn generate(&mut self, index: usize, seller: &Seller) -> Bid {
        let discount = self.rng.gen_range(MIN_DISCOUNT..MAX_DISCOUNT);
        let offset_ms = self.rng.gen_range(0..MAX_SUBMIT_OFFSET_MS);

        Bid {
            id: format!("bid_{}", index),
            seller_id: seller.id.clone(),
            seller_name: seller.name.clone(),
            price: (seller.price - discount).max(0),
            delivery_time: seller.delivery_time.clone(),
            freebies: self.freebies(),
            message: self.message(),
            rating: seller.rating,
            submitted_at: self.now - Duration::milliseconds(offset_ms),
        }
    }

    // 개수만 무작위, 항목은 고정 순서의 앞에서부터
    fn freebies(&mut self) -> Vec<String> {
        let count = self.rng.gen_range(1..=3);
        FREEBIES[..count].iter().map(|f| f.to_string()).collect()
    }

    fn message(&mut self) -> String {
        MESSAGES[self.rng.gen_range(0..MESSAGES.len())].to_string()
    }
}
// endregion: --- Generator

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seller(id: &str, price: i64) -> Seller {
        Seller {
            id: id.to_string(),
            name: format!("Seller {}", id),
            price,
            rating: 4.2,
            delivery_time: "Same day".to_string(),
            badges: vec!["Verified".to_string()],
        }
    }

    #[test]
    fn generated_bids_are_discounts_within_range() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(7);
        let sellers: Vec<Seller> = (0..50)
            .map(|i| seller(&format!("s{}", i), 1000 + i * 37))
            .collect();

        let bids = BidGenerator::new(&mut rng, now).generate_all(&sellers);

        assert_eq!(bids.len(), sellers.len());
        for (bid, seller) in bids.iter().zip(&sellers) {
            let discount = seller.price - bid.price;
            assert!(bid.price < seller.price);
            assert!((MIN_DISCOUNT..MAX_DISCOUNT).contains(&discount));
            assert_eq!(bid.seller_id, seller.id);
            assert_eq!(bid.delivery_time, seller.delivery_time);
            assert_eq!(bid.rating, seller.rating);
            assert!(bid.submitted_at <= now);
            assert!(now - bid.submitted_at < Duration::hours(1));
        }
    }

    #[test]
    fn freebies_are_a_prefix_of_the_catalog() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut generator = BidGenerator::new(&mut rng, Utc::now());
        for i in 0..30 {
            let bid = generator.generate(i, &seller("s", 5000));
            assert!((1..=3).contains(&bid.freebies.len()));
            assert_eq!(bid.freebies, FREEBIES[..bid.freebies.len()].to_vec());
            assert!(MESSAGES.contains(&bid.message.as_str()));
        }
    }

    #[test]
    fn cheap_seller_price_is_floored_at_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        let bid = BidGenerator::new(&mut rng, Utc::now()).generate(0, &seller("s", 50));
        assert_eq!(bid.price, 0);
    }

    #[test]
    fn same_seed_gives_same_bids() {
        let now = Utc::now();
        let sellers = vec![seller("a", 2000), seller("b", 3000)];
        let first = BidGenerator::new(&mut StdRng::seed_from_u64(42), now).generate_all(&sellers);
        let second = BidGenerator::new(&mut StdRng::seed_from_u64(42), now).generate_all(&sellers);
        assert_eq!(first, second);
        assert_eq!(first[1].id, "bid_1");
    }
}
