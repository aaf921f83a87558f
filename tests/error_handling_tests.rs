use atcommander::core::script::ScriptParseError;
use atcommander::core::transaction::TransactionError;
use atcommander::{AtCommanderError, AtCommanderResult, ChannelError};
use std::error::Error;

/// Error handling and resilience tests
#[cfg(test)]
mod error_handling_tests {
    use super::*;

    #[test]
    fn test_error_types() {
        // Test different error variants
        let errors = vec![
            AtCommanderError::Config {
                message: "Config error".to_string(),
            },
            AtCommanderError::Script {
                message: "Script error".to_string(),
            },
            AtCommanderError::Channel(ChannelError::NotOpen),
            AtCommanderError::Transaction("Transaction error".to_string()),
            AtCommanderError::InvalidInput("Invalid input".to_string()),
            AtCommanderError::Output("Output error".to_string()),
        ];

        for error in errors {
            // All errors should display properly
            let display = error.to_string();
            assert!(!display.is_empty(), "Error display should not be empty");

            // All errors should be Send + Sync for async compatibility
            fn assert_send_sync<T: Send + Sync>() {}
            assert_send_sync::<AtCommanderError>();
        }
    }

    #[test]
    fn test_error_conversion() {
        // Test std::io::Error conversion
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let converted: AtCommanderError = io_error.into();
        assert!(matches!(converted, AtCommanderError::Io(_)));

        // Channel errors wrap without losing their message
        let converted: AtCommanderError = ChannelError::AlreadyOpen.into();
        assert!(matches!(converted, AtCommanderError::Channel(_)));
        assert!(converted.to_string().contains("already open"));

        // Transaction and script failures flatten to their display text
        let converted: AtCommanderError = TransactionError::NoPortSelected.into();
        assert!(matches!(converted, AtCommanderError::Transaction(_)));

        let converted: AtCommanderError = ScriptParseError::MissingName.into();
        assert!(matches!(converted, AtCommanderError::Script { .. }));
        assert!(converted.to_string().contains("[NAME]"));
    }

    #[test]
    fn test_operator_facing_messages() {
        // These exact strings reach the bench operator
        assert_eq!(
            TransactionError::NoPortSelected.to_string(),
            "No serial port selected"
        );
        assert_eq!(
            TransactionError::ChannelNotOpen {
                port: "/dev/ttyACM0".to_string()
            }
            .to_string(),
            "Serial device \"/dev/ttyACM0\" is not open"
        );
        assert_eq!(
            TransactionError::CollectTimeout { waited_ms: 5000 }.to_string(),
            "Response timed out after 5000ms"
        );
        assert_eq!(ChannelError::NotOpen.to_string(), "Channel is not open");
        assert_eq!(
            ChannelError::AlreadyOpen.to_string(),
            "Channel is already open"
        );
        assert_eq!(
            AtCommanderError::from(TransactionError::NoPortSelected).to_string(),
            "Transaction failed: No serial port selected"
        );
    }

    #[test]
    fn test_result_type() {
        fn success_function() -> AtCommanderResult<String> {
            Ok("success".to_string())
        }

        fn error_function() -> AtCommanderResult<String> {
            Err(AtCommanderError::Config {
                message: "Test error".to_string(),
            })
        }

        let success = success_function();
        assert!(success.is_ok());
        assert_eq!(success.unwrap(), "success");

        let error = error_function();
        assert!(error.is_err());
        assert!(error.unwrap_err().to_string().contains("Configuration"));
    }

    #[test]
    fn test_error_chain() {
        // Test error chaining with source
        let root_cause = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Access denied");
        let io_error: AtCommanderError = root_cause.into();

        // Should be able to walk the error chain
        let mut current_error: &dyn Error = &io_error;
        let mut depth = 0;

        while let Some(source) = current_error.source() {
            current_error = source;
            depth += 1;
            if depth > 10 {
                break; // Prevent infinite loops
            }
        }

        assert!(depth > 0, "Should have at least one source error");
    }

    #[test]
    fn test_error_formatting() {
        let error = AtCommanderError::Script {
            message: "Missing [END] after [START] in 'provision.script'".to_string(),
        };

        let display = format!("{}", error);
        let debug = format!("{:?}", error);

        assert!(display.contains("Script error"));
        assert!(display.contains("Missing [END]"));
        assert!(!debug.is_empty());
        assert_ne!(display, debug); // Display and debug should be different
    }

    #[tokio::test]
    async fn test_async_error_propagation() {
        async fn failing_async_function() -> AtCommanderResult<()> {
            Err(AtCommanderError::Channel(ChannelError::NotOpen))
        }

        async fn calling_function() -> AtCommanderResult<()> {
            failing_async_function().await?;
            Ok(())
        }

        let result = calling_function().await;
        assert!(result.is_err());

        let error = result.unwrap_err();
        assert!(error.to_string().contains("Channel error"));
        assert!(error.to_string().contains("not open"));
    }

    #[test]
    fn test_error_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let error = Arc::new(AtCommanderError::Config {
            message: "Thread safety test".to_string(),
        });

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let error_clone = Arc::clone(&error);
                thread::spawn(move || {
                    let display = format!("Thread {}: {}", i, error_clone);
                    assert!(display.contains("Thread safety test"));
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("Thread panicked");
        }
    }

    #[test]
    fn test_error_size() {
        use std::mem;

        // Errors should not be too large (affects performance)
        let error_size = mem::size_of::<AtCommanderError>();
        assert!(error_size <= 128, "AtCommanderError too large: {} bytes", error_size);
    }

    #[test]
    fn test_error_in_option_result() {
        // Test error handling in complex return types
        fn complex_function() -> Option<AtCommanderResult<String>> {
            Some(Err(AtCommanderError::Output("Complex error".to_string())))
        }

        match complex_function() {
            Some(Ok(_)) => panic!("Should not succeed"),
            Some(Err(e)) => assert!(e.to_string().contains("Complex error")),
            None => panic!("Should not be None"),
        }
    }
}
