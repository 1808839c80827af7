#[cfg(test)]
mod tests_end_to_end {
    use parfeed::prelude::*;

    /// Runs a JSON request stream and returns the decoded response lines.
    fn serve(config: ServerConfig, input: &str) -> Vec<Response> {
        let dispatcher = Dispatcher::new(config);
        let mut output = Vec::new();
        dispatcher
            .run(
                JsonRequestSource::new(input.as_bytes()),
                JsonResponseSink::new(&mut output),
            )
            .expect("run succeeds");

        String::from_utf8(output)
            .expect("utf-8 output")
            .lines()
            .map(|line| serde_json::from_str(line).expect("one response per line"))
            .collect()
    }

    fn response(responses: &[Response], id: i64) -> &Response {
        responses
            .iter()
            .find(|r| r.id == id)
            .unwrap_or_else(|| panic!("no response for id {id}"))
    }

    #[test]
    fn feed_lists_most_recent_first() {
        let input = r#"
            {"command":"ADD","id":1,"body":"hello","timestamp":100.0}
            {"command":"ADD","id":2,"body":"world","timestamp":200.0}
            {"command":"FEED","id":3}
            {"command":"DONE","id":4}
        "#;

        for config in [ServerConfig::sequential(), ServerConfig::parallel(1)] {
            let responses = serve(config, input);
            assert_eq!(responses.len(), 3);
            assert_eq!(
                response(&responses, 3).feed,
                Some(vec![
                    FeedEntry::new("world", 200.0),
                    FeedEntry::new("hello", 100.0),
                ])
            );
        }
    }

    #[test]
    fn contains_after_remove_reports_failure() {
        let input = r#"
            {"command":"ADD","id":1,"body":"x","timestamp":5.0}
            {"command":"REMOVE","id":2,"timestamp":5.0}
            {"command":"CONTAINS","id":3,"timestamp":5.0}
            {"command":"DONE","id":4}
        "#;

        for config in [ServerConfig::sequential(), ServerConfig::parallel(1)] {
            let responses = serve(config, input);
            assert_eq!(response(&responses, 1).success, Some(true));
            assert_eq!(response(&responses, 2).success, Some(true));
            assert_eq!(response(&responses, 3).success, Some(false));
        }
    }

    #[test]
    fn remove_of_unknown_timestamp_reports_failure() {
        let input = r#"
            {"command":"ADD","id":1,"body":"x","timestamp":5.0}
            {"command":"REMOVE","id":2,"timestamp":6.0}
            {"command":"DONE","id":3}
        "#;

        let responses = serve(ServerConfig::sequential(), input);
        assert_eq!(response(&responses, 2).success, Some(false));
    }

    #[test]
    fn parallel_mode_answers_every_request_once() {
        let mut input = String::new();
        for i in 0..500 {
            input.push_str(&format!(
                "{{\"command\":\"ADD\",\"id\":{i},\"body\":\"post {i}\",\"timestamp\":{i}.5}}\n"
            ));
        }
        input.push_str("{\"command\":\"DONE\",\"id\":500}\n");

        let responses = serve(ServerConfig::parallel(8), &input);
        assert_eq!(responses.len(), 500);

        let mut ids: Vec<i64> = responses.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..500).collect::<Vec<_>>());
        assert!(responses.iter().all(|r| r.success == Some(true)));
    }

    #[test]
    fn malformed_stream_fails_the_run() {
        let input = "{\"command\":\"ADD\",\"id\":1,\"timestamp\":1.0}\nnot json\n";

        for config in [ServerConfig::sequential(), ServerConfig::parallel(2)] {
            let dispatcher = Dispatcher::new(config);
            let mut output = Vec::new();
            let err = dispatcher
                .run(
                    JsonRequestSource::new(input.as_bytes()),
                    JsonResponseSink::new(&mut output),
                )
                .expect_err("malformed input must fail");

            assert!(matches!(err, ServerError::Decode { line: 2, .. }), "{err:?}");
            assert_eq!(String::from_utf8(output).expect("utf-8").lines().count(), 1);
        }
    }
}
