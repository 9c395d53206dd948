/// 构建后缀数组（前缀倍增，O(n log^2 n)）。
/// 输入为数值化的文本（0:$,1:A,2:C,3:G,4:T,5:N），允许出现多个 0 作为 contig 分隔符；
/// 越过文本末尾视为比任何字符都小，因此较短的后缀排在前面。
pub fn build_sa(text: &[u8]) -> Vec<u32> {
    let n = text.len();
    if n == 0 {
        return Vec::new();
    }
    let mut sa: Vec<u32> = (0..n as u32).collect();
    let mut rank: Vec<i64> = text.iter().map(|&b| i64::from(b)).collect();
    let mut next_rank = vec![0i64; n];

    let mut k = 1usize;
    loop {
        let key = |i: u32| -> (i64, i64) {
            let i = i as usize;
            (rank[i], if i + k < n { rank[i + k] } else { -1 })
        };
        sa.sort_unstable_by_key(|&i| key(i));

        next_rank[sa[0] as usize] = 0;
        for w in 1..n {
            let bump = i64::from(key(sa[w]) != key(sa[w - 1]));
            next_rank[sa[w] as usize] = next_rank[sa[w - 1] as usize] + bump;
        }
        std::mem::swap(&mut rank, &mut next_rank);

        // 所有秩互不相同即完成
        if rank[sa[n - 1] as usize] as usize == n - 1 || k >= n {
            break;
        }
        k <<= 1;
    }
    sa
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_sa(text: &[u8]) -> Vec<u32> {
        let mut idx: Vec<u32> = (0..text.len() as u32).collect();
        idx.sort_by(|&a, &b| text[a as usize..].cmp(&text[b as usize..]));
        idx
    }

    fn lcg_text(len: usize, seed: u32) -> Vec<u8> {
        let mut x = seed;
        (0..len)
            .map(|_| {
                x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                ((x >> 16) % 6) as u8
            })
            .collect()
    }

    #[test]
    fn sa_basic() {
        // A C G T $ -> 1 2 3 4 0
        assert_eq!(build_sa(&[1u8, 2, 3, 4, 0]), vec![4, 0, 1, 2, 3]);
    }

    #[test]
    fn sa_matches_naive_on_random_texts() {
        for len in 1..=40 {
            let text = lcg_text(len, 7 + len as u32);
            assert_eq!(build_sa(&text), naive_sa(&text), "len={}", len);
        }
    }

    #[test]
    fn sa_handles_repeats_and_separators() {
        let text = [1u8, 1, 1, 0, 1, 1, 0];
        assert_eq!(build_sa(&text), naive_sa(&text));
    }
}
