//! `execute` 脚本构建。
//!
//! VK 的 `execute` 单次最多允许 25 次 API 调用，所以批大小固定为 25。

use super::models::WallCommentRef;

pub const MAX_CALLS_PER_EXECUTE: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteBatch {
    pub refs: Vec<WallCommentRef>,
    pub code: String,
}

impl ExecuteBatch {
    pub fn len(&self) -> usize {
        self.refs.len()
    }
}

fn delete_call(c: &WallCommentRef) -> String {
    format!(
        r#"API.wall.deleteComment({{"owner_id": {}, "comment_id": {}}})"#,
        c.owner_id, c.comment_id
    )
}

/// 生成返回布尔数组的脚本，数组顺序与 `refs` 一致。
pub fn build_script(refs: &[WallCommentRef]) -> String {
    let calls: Vec<String> = refs.iter().map(delete_call).collect();
    format!("return [{}];", calls.join(","))
}

/// 按原顺序切成不超过 25 条的批。
pub fn build_batches(refs: &[WallCommentRef]) -> Vec<ExecuteBatch> {
    refs.chunks(MAX_CALLS_PER_EXECUTE)
        .map(|chunk| ExecuteBatch {
            refs: chunk.to_vec(),
            code: build_script(chunk),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(n: usize) -> Vec<WallCommentRef> {
        (0..n)
            .map(|i| WallCommentRef::parse(&format!("wall-1_{i}")).unwrap())
            .collect()
    }

    #[test]
    fn script_format() {
        let r = vec![
            WallCommentRef::parse("wall123_456").unwrap(),
            WallCommentRef::parse("wall-7_8?reply=9").unwrap(),
        ];
        assert_eq!(
            build_script(&r),
            r#"return [API.wall.deleteComment({"owner_id": 123, "comment_id": 456}),API.wall.deleteComment({"owner_id": -7, "comment_id": 9})];"#
        );
    }

    #[test]
    fn sixty_one_refs_make_25_25_11_in_order() {
        let all = refs(61);
        let batches = build_batches(&all);
        let sizes: Vec<_> = batches.iter().map(ExecuteBatch::len).collect();
        assert_eq!(sizes, vec![25, 25, 11]);

        let flattened: Vec<_> = batches.iter().flat_map(|b| b.refs.clone()).collect();
        assert_eq!(flattened, all);

        for b in &batches {
            assert_eq!(b.code.matches("API.wall.deleteComment(").count(), b.len());
            assert!(b.code.starts_with("return ["));
            assert!(b.code.ends_with("];"));
        }
    }

    #[test]
    fn no_refs_no_batches() {
        assert!(build_batches(&[]).is_empty());
    }
}
